//! GitLab API client creation and request plumbing.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::GitLabError;
use super::pagination::walk_pages;
use super::types::{
    AccessLevel, AddMemberRequest, Branch, BranchPolicy, CLEANUP_POLICY, CreateBranchRequest,
    CreateGroupRequest, CreateMirrorRequest, CreateProjectRequest, DefaultBranchUpdate, EntityRef,
    GitLabGroup, GitLabProject, GitLabUser, MirrorConfig, NewGroup, NewProject, PROTECTED_TAG,
    ProjectVariable,
};
use crate::fleet::ProgressCallback;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpMethod, HttpRequest, HttpTransport};
use crate::platform::{self, Collection, FleetClient};

/// Request timeout for the default transport.
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// GitLab REST client.
///
/// Cheap to clone: the transport is shared, so every fan-out task can own a
/// handle.
#[derive(Clone)]
pub struct GitLabClient {
    transport: Arc<dyn HttpTransport>,
    base: Url,
    token: String,
    per_page: Option<u32>,
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("api_url", &self.base.as_str())
            .field("token", &"<redacted>")
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}

impl GitLabClient {
    /// Create a client backed by reqwest.
    ///
    /// # Arguments
    ///
    /// * `api_url` - API base, e.g. "https://gitlab.example.com/api/v4"
    /// * `token` - Personal or project access token
    pub fn new(api_url: &str, token: &str) -> Result<Self, GitLabError> {
        let transport = ReqwestTransport::with_timeout(REQUEST_TIMEOUT)
            .map_err(|e| GitLabError::Config(e.to_string()))?;
        Self::new_with_transport(api_url, token, Arc::new(transport))
    }

    pub fn new_with_transport(
        api_url: &str,
        token: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, GitLabError> {
        let base = Url::parse(api_url.trim_end_matches('/'))
            .map_err(|e| GitLabError::Config(format!("invalid API URL {api_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(GitLabError::Config(format!(
                "API URL {api_url:?} cannot carry a path"
            )));
        }

        Ok(Self {
            transport,
            base,
            token: token.to_string(),
            per_page: None,
        })
    }

    /// Request a specific page size on listings (server default otherwise).
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn api_url(&self) -> &str {
        self.base.as_str()
    }

    /// Build an endpoint URL. Each segment is percent-encoded on its own, so
    /// branch names containing `/` stay a single segment.
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    async fn send(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, GitLabError> {
        tracing::debug!(%method, url = %url, "GitLab request");

        let request = HttpRequest::new(method, url)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_header("User-Agent", "steward")
            .with_header("PRIVATE-TOKEN", self.token.as_str())
            .with_body(body.unwrap_or_default());

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(GitLabError::from_status(
                response.status,
                &response.body_text(),
            ));
        }

        Ok(response.body)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, GitLabError> {
        let url = self.url(segments, query);
        let endpoint = url.path().to_string();
        let body = self.send(HttpMethod::Get, url, None).await?;
        serde_json::from_slice(&body).map_err(|e| GitLabError::decode(endpoint, &e))
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        segments: &[&str],
        payload: &B,
    ) -> Result<Vec<u8>, GitLabError> {
        let url = self.url(segments, &[]);
        let body = serde_json::to_vec(payload)
            .map_err(|e| GitLabError::decode(url.path().to_string(), &e))?;
        self.send(method, url, Some(body)).await
    }

    async fn delete(&self, segments: &[&str], query: &[(&str, String)]) -> Result<(), GitLabError> {
        let url = self.url(segments, query);
        self.send(HttpMethod::Delete, url, None).await.map(|_| ())
    }

    /// Append the page size (when configured) and page number to `query`.
    fn paged(&self, mut query: Vec<(&'static str, String)>, page: u32) -> Vec<(&'static str, String)> {
        if let Some(per_page) = self.per_page {
            query.push(("per_page", per_page.to_string()));
        }
        query.push(("page", page.to_string()));
        query
    }

    /// Fetch one page of a listing.
    async fn list_page(
        &self,
        collection: Collection,
        page: u32,
    ) -> Result<Vec<EntityRef>, GitLabError> {
        let query = collection
            .query()
            .iter()
            .map(|(k, v)| (*k, (*v).to_string()))
            .collect();
        self.get(&[collection.path()], &self.paged(query, page))
            .await
    }
}

#[async_trait]
impl FleetClient for GitLabClient {
    async fn walk(
        &self,
        collection: Collection,
        on_progress: Option<&ProgressCallback>,
    ) -> platform::Result<Vec<EntityRef>> {
        walk_pages(
            collection.path(),
            |page| self.list_page(collection, page),
            on_progress,
        )
        .await
    }

    async fn list_branches(&self, project_id: u64) -> platform::Result<Vec<Branch>> {
        let id = project_id.to_string();
        self.get(&["projects", &id, "repository", "branches"], &[])
            .await
    }

    async fn create_branch(
        &self,
        project_id: u64,
        branch: &str,
        reference: &str,
    ) -> platform::Result<()> {
        let id = project_id.to_string();
        let payload = CreateBranchRequest { branch, reference };
        self.write(
            HttpMethod::Post,
            &["projects", &id, "repository", "branches"],
            &payload,
        )
        .await
        .map(|_| ())
    }

    async fn set_default_branch(&self, project_id: u64, branch: &str) -> platform::Result<()> {
        let id = project_id.to_string();
        let payload = DefaultBranchUpdate {
            default_branch: branch,
            ci_forward_deployment_enabled: false,
            service_desk_enabled: false,
        };
        self.write(HttpMethod::Put, &["projects", &id], &payload)
            .await
            .map(|_| ())
    }

    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> platform::Result<()> {
        let id = project_id.to_string();
        self.delete(&["projects", &id, "protected_branches", branch], &[])
            .await
    }

    async fn protect_branch(&self, project_id: u64, policy: &BranchPolicy) -> platform::Result<()> {
        let id = project_id.to_string();
        self.write(
            HttpMethod::Post,
            &["projects", &id, "protected_branches"],
            policy,
        )
        .await
        .map(|_| ())
    }

    async fn update_cleanup_policy(&self, project_id: u64) -> platform::Result<()> {
        let id = project_id.to_string();
        self.write(HttpMethod::Put, &["projects", &id], &CLEANUP_POLICY)
            .await
            .map(|_| ())
    }

    async fn unprotect_tag(&self, project_id: u64, pattern: &str) -> platform::Result<()> {
        let id = project_id.to_string();
        self.delete(&["projects", &id, "protected_tags", pattern], &[])
            .await
    }

    async fn protect_tag(&self, project_id: u64) -> platform::Result<()> {
        let id = project_id.to_string();
        self.write(
            HttpMethod::Post,
            &["projects", &id, "protected_tags"],
            &PROTECTED_TAG,
        )
        .await
        .map(|_| ())
    }

    async fn list_remote_mirrors(&self, project_id: u64) -> platform::Result<Vec<MirrorConfig>> {
        let id = project_id.to_string();
        self.get(&["projects", &id, "remote_mirrors"], &[]).await
    }

    async fn delete_remote_mirror(&self, project_id: u64, mirror_id: u64) -> platform::Result<()> {
        let id = project_id.to_string();
        let mirror = mirror_id.to_string();
        self.delete(&["projects", &id, "remote_mirrors", &mirror], &[])
            .await
    }

    async fn create_remote_mirror(&self, project_id: u64, url: &str) -> platform::Result<()> {
        let id = project_id.to_string();
        let payload = CreateMirrorRequest {
            enabled: true,
            url: url.to_string(),
            only_protected_branches: true,
        };
        self.write(
            HttpMethod::Post,
            &["projects", &id, "remote_mirrors"],
            &payload,
        )
        .await
        .map(|_| ())
    }

    async fn find_users(&self, username: &str) -> platform::Result<Vec<GitLabUser>> {
        self.get(&["users"], &[("username", username.to_string())])
            .await
    }

    async fn remove_group_member(&self, group_id: u64, user_id: u64) -> platform::Result<()> {
        let group = group_id.to_string();
        let user = user_id.to_string();
        self.delete(&["groups", &group, "members", &user], &[])
            .await
    }

    async fn get_group(&self, group_id: u64) -> platform::Result<GitLabGroup> {
        let group = group_id.to_string();
        self.get(&["groups", &group], &[]).await
    }

    async fn create_project(
        &self,
        project: &NewProject,
        visibility: &str,
    ) -> platform::Result<GitLabProject> {
        let payload = CreateProjectRequest::new(project, visibility);
        let body = self
            .write(HttpMethod::Post, &["projects"], &payload)
            .await?;
        serde_json::from_slice(&body).map_err(|e| GitLabError::decode("/projects", &e))
    }

    async fn list_users(&self) -> platform::Result<Vec<GitLabUser>> {
        walk_pages(
            "users",
            |page| async move { self.get(&["users"], &self.paged(Vec::new(), page)).await },
            None,
        )
        .await
    }

    async fn create_group(&self, group: &NewGroup) -> platform::Result<GitLabGroup> {
        let body = self
            .write(HttpMethod::Post, &["groups"], &CreateGroupRequest::from(group))
            .await?;
        serde_json::from_slice(&body).map_err(|e| GitLabError::decode("/groups", &e))
    }

    async fn add_group_member(
        &self,
        group_id: u64,
        user_id: u64,
        access_level: AccessLevel,
    ) -> platform::Result<()> {
        let group = group_id.to_string();
        let payload = AddMemberRequest {
            user_id,
            access_level,
        };
        self.write(HttpMethod::Post, &["groups", &group, "members"], &payload)
            .await
            .map(|_| ())
    }

    async fn list_project_variables(&self, project_id: u64) -> platform::Result<Vec<ProjectVariable>> {
        let id = project_id.to_string();
        let id = id.as_str();
        walk_pages(
            "variables",
            |page| async move {
                self.get(&["projects", id, "variables"], &self.paged(Vec::new(), page))
                    .await
            },
            None,
        )
        .await
    }

    async fn delete_project_variable(
        &self,
        project_id: u64,
        key: &str,
        environment_scope: &str,
    ) -> platform::Result<()> {
        let id = project_id.to_string();
        // Without the scope filter GitLab refuses keys defined in several scopes.
        self.delete(
            &["projects", &id, "variables", key],
            &[("filter[environment_scope]", environment_scope.to_string())],
        )
        .await
    }
}
