//! GitLab API data types.
//!
//! Response types only declare the fields the fleet operations read; serde
//! ignores everything else GitLab sends back. Request types serialize to the
//! exact JSON bodies the mutations issue.

use serde::{Deserialize, Serialize};

/// Minimal shape of any entry in a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct EntityRef {
    pub id: u64,
}

impl EntityRef {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

/// Snapshot of one repository branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    /// GitLab does not always include a branch id.
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    /// Whether this is the project's default branch.
    #[serde(rename = "default", default)]
    pub is_default: bool,
}

/// A remote (push) mirror configured on a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MirrorConfig {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
}

/// User as returned by the users listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Admin-only free text; default group members are tagged here.
    #[serde(default)]
    pub note: Option<String>,
}

/// Project as returned after creation.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Group as returned by the single-group and create-group endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabGroup {
    pub id: u64,
    #[serde(default)]
    pub full_path: String,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub request_access_enabled: bool,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

/// CI/CD variable attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectVariable {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "any_environment")]
    pub environment_scope: String,
    #[serde(default)]
    pub variable_type: Option<String>,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub masked: bool,
}

fn any_environment() -> String {
    "*".to_string()
}

/// GitLab's ordinal permission scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub u8);

impl AccessLevel {
    pub const NO_ACCESS: Self = Self(0);
    pub const DEVELOPER: Self = Self(30);
    pub const MAINTAINER: Self = Self(40);
    pub const OWNER: Self = Self(50);
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A protected-branch rule. Serializes to the create-rule request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchPolicy {
    pub name: String,
    pub push_access_level: AccessLevel,
    pub merge_access_level: AccessLevel,
}

impl BranchPolicy {
    pub fn new(name: impl Into<String>, push: AccessLevel, merge: AccessLevel) -> Self {
        Self {
            name: name.into(),
            push_access_level: push,
            merge_access_level: merge,
        }
    }
}

impl std::fmt::Display for BranchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (push={}, merge={})",
            self.name, self.push_access_level, self.merge_access_level
        )
    }
}

/// Body of the project update that sets the default branch.
///
/// The two flags are always forced off alongside the branch change.
#[derive(Debug, Serialize)]
pub(crate) struct DefaultBranchUpdate<'a> {
    pub default_branch: &'a str,
    pub ci_forward_deployment_enabled: bool,
    pub service_desk_enabled: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateMirrorRequest {
    pub enabled: bool,
    pub url: String,
    pub only_protected_branches: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContainerExpirationPolicy {
    pub cadence: &'static str,
    pub enabled: bool,
    pub keep_n: u32,
    pub older_than: &'static str,
    pub name_regex: &'static str,
    pub name_regex_keep: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CleanupPolicyUpdate {
    pub container_expiration_policy_attributes: ContainerExpirationPolicy,
}

/// Retention policy applied to every project's container registry.
pub(crate) const CLEANUP_POLICY: CleanupPolicyUpdate = CleanupPolicyUpdate {
    container_expiration_policy_attributes: ContainerExpirationPolicy {
        cadence: "1month",
        enabled: true,
        keep_n: 1,
        older_than: "14d",
        name_regex: ".*",
        name_regex_keep: ".*-main",
    },
};

#[derive(Debug, Serialize)]
pub(crate) struct AllowedToCreate {
    pub access_level: AccessLevel,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProtectedTagRequest {
    pub name: &'static str,
    pub allowed_to_create: [AllowedToCreate; 1],
}

/// Tag pattern protected on every project.
pub const PROTECTED_TAG_PATTERN: &str = "*";

pub(crate) const PROTECTED_TAG: ProtectedTagRequest = ProtectedTagRequest {
    name: PROTECTED_TAG_PATTERN,
    allowed_to_create: [AllowedToCreate {
        access_level: AccessLevel::MAINTAINER,
    }],
};

#[derive(Debug, Serialize)]
pub(crate) struct CreateBranchRequest<'a> {
    pub branch: &'a str,
    #[serde(rename = "ref")]
    pub reference: &'a str,
}

/// Parameters for a new group. `parent_id` makes it a subgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub path: String,
    pub parent_id: Option<u64>,
    pub visibility: String,
    pub request_access_enabled: bool,
}

/// Create-group body. Creation rights are fixed: maintainers may add
/// projects, only owners may add subgroups.
#[derive(Debug, Serialize)]
pub(crate) struct CreateGroupRequest<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub parent_id: Option<u64>,
    pub visibility: &'a str,
    pub request_access_enabled: bool,
    pub project_creation_level: &'static str,
    pub subgroup_creation_level: &'static str,
}

impl<'a> From<&'a NewGroup> for CreateGroupRequest<'a> {
    fn from(group: &'a NewGroup) -> Self {
        Self {
            name: &group.name,
            path: &group.path,
            parent_id: group.parent_id,
            visibility: &group.visibility,
            request_access_enabled: group.request_access_enabled,
            project_creation_level: "maintainer",
            subgroup_creation_level: "owner",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AddMemberRequest {
    pub user_id: u64,
    pub access_level: AccessLevel,
}

/// Parameters for bootstrapping a new project.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub path: String,
    pub namespace_id: u64,
    /// Inherited from the namespace when `None`.
    pub visibility: Option<String>,
    pub default_branch: String,
    pub shared_runners: bool,
}

/// Create-project body. Everything except the identifying fields is fixed.
#[derive(Debug, Serialize)]
pub(crate) struct CreateProjectRequest<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub namespace_id: u64,
    pub visibility: &'a str,
    pub default_branch: &'a str,
    pub shared_runners_enabled: bool,
    pub merge_method: &'static str,
    pub squash_option: &'static str,
    pub lfs_enabled: bool,
    pub initialize_with_readme: bool,
    pub packages_enabled: bool,
    pub issues_access_level: &'static str,
    pub pages_access_level: &'static str,
    pub operations_access_level: &'static str,
    pub analytics_access_level: &'static str,
    pub security_and_compliance_access_level: &'static str,
    pub snippets_access_level: &'static str,
    pub wiki_access_level: &'static str,
    pub forking_access_level: &'static str,
}

impl<'a> CreateProjectRequest<'a> {
    pub(crate) fn new(project: &'a NewProject, visibility: &'a str) -> Self {
        Self {
            name: &project.name,
            path: &project.path,
            namespace_id: project.namespace_id,
            visibility,
            default_branch: &project.default_branch,
            shared_runners_enabled: project.shared_runners,
            merge_method: "ff",
            squash_option: "never",
            lfs_enabled: false,
            initialize_with_readme: true,
            packages_enabled: true,
            issues_access_level: "disabled",
            pages_access_level: "disabled",
            operations_access_level: "disabled",
            analytics_access_level: "disabled",
            security_and_compliance_access_level: "disabled",
            snippets_access_level: "enabled",
            wiki_access_level: "disabled",
            forking_access_level: "disabled",
        }
    }
}
