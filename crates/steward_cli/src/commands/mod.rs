pub(crate) mod gitlab;
pub(crate) mod meta;
pub(crate) mod shared;
pub(crate) mod summary;
pub(crate) mod variables;
