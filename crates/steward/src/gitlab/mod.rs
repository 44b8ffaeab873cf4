//! GitLab REST client.
//!
//! This module provides the typed client the fleet operations run against,
//! along with the request and response shapes it exchanges with GitLab.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitLab API operations
//! - [`types`] - Response shapes and fixed request bodies
//! - [`client`] - Client creation and the [`FleetClient`](crate::platform::FleetClient) impl
//! - [`pagination`] - Page-numbered collection walking
//!
//! # Example
//!
//! ```ignore
//! use steward::gitlab::GitLabClient;
//! use steward::platform::{Collection, FleetClient};
//!
//! let client = GitLabClient::new("https://gitlab.example.com/api/v4", &token)?;
//! let projects = client.walk(Collection::Projects, None).await?;
//! ```

mod client;
mod error;
pub mod pagination;
mod types;

pub use client::GitLabClient;
pub use error::{GitLabError, short_error_message};
pub use pagination::{FIRST_PAGE, walk_pages};
pub use types::{
    AccessLevel, Branch, BranchPolicy, EntityRef, GitLabGroup, GitLabProject, GitLabUser,
    MirrorConfig, NewGroup, NewProject, PROTECTED_TAG_PATTERN, ProjectVariable,
};
