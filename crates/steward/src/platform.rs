//! Client abstraction used by the fleet orchestrators.
//!
//! The orchestrators in [`crate::fleet`] are generic over [`FleetClient`] so
//! they can run against the real GitLab API or an in-memory double. The trait
//! exposes raw API calls only; idempotency and policy live one layer up in
//! [`crate::fleet::mutations`].

use async_trait::async_trait;

use crate::fleet::ProgressCallback;
use crate::gitlab::{
    AccessLevel, Branch, BranchPolicy, EntityRef, GitLabError, GitLabGroup, GitLabProject,
    GitLabUser, MirrorConfig, NewGroup, NewProject, ProjectVariable,
};

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, GitLabError>;

/// Paginated collections the walker knows how to exhaust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Projects,
    Groups,
}

impl Collection {
    /// Path segments below the API base.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::Groups => "groups",
        }
    }

    /// Extra query parameters sent with every page request.
    #[must_use]
    pub fn query(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Collection::Projects => &[("simple", "true")],
            Collection::Groups => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Raw API surface needed by the fleet operations.
#[async_trait]
pub trait FleetClient: Send + Sync {
    /// Exhaust a paginated collection, starting at page 1 and stopping at the
    /// first empty page.
    async fn walk(
        &self,
        collection: Collection,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<EntityRef>>;

    async fn list_branches(&self, project_id: u64) -> Result<Vec<Branch>>;

    async fn create_branch(&self, project_id: u64, branch: &str, reference: &str) -> Result<()>;

    async fn set_default_branch(&self, project_id: u64, branch: &str) -> Result<()>;

    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> Result<()>;

    async fn protect_branch(&self, project_id: u64, policy: &BranchPolicy) -> Result<()>;

    async fn update_cleanup_policy(&self, project_id: u64) -> Result<()>;

    async fn unprotect_tag(&self, project_id: u64, pattern: &str) -> Result<()>;

    async fn protect_tag(&self, project_id: u64) -> Result<()>;

    async fn list_remote_mirrors(&self, project_id: u64) -> Result<Vec<MirrorConfig>>;

    async fn delete_remote_mirror(&self, project_id: u64, mirror_id: u64) -> Result<()>;

    async fn create_remote_mirror(&self, project_id: u64, url: &str) -> Result<()>;

    async fn find_users(&self, username: &str) -> Result<Vec<GitLabUser>>;

    async fn remove_group_member(&self, group_id: u64, user_id: u64) -> Result<()>;

    async fn get_group(&self, group_id: u64) -> Result<GitLabGroup>;

    async fn create_project(&self, project: &NewProject, visibility: &str)
    -> Result<GitLabProject>;

    /// Every user visible to the token, across all pages.
    async fn list_users(&self) -> Result<Vec<GitLabUser>>;

    async fn create_group(&self, group: &NewGroup) -> Result<GitLabGroup>;

    async fn add_group_member(
        &self,
        group_id: u64,
        user_id: u64,
        access_level: AccessLevel,
    ) -> Result<()>;

    /// Every CI/CD variable of a project, across all pages and scopes.
    async fn list_project_variables(&self, project_id: u64) -> Result<Vec<ProjectVariable>>;

    /// Delete the variable `key` defined for exactly `environment_scope`.
    async fn delete_project_variable(
        &self,
        project_id: u64,
        key: &str,
        environment_scope: &str,
    ) -> Result<()>;
}
