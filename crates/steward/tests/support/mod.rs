//! Stateful in-memory GitLab used by the integration tests.
//!
//! Implements just enough of the REST API for the fleet operations:
//! paginated listings, branches, protected branches and tags, remote
//! mirrors, groups and their members, project variables and project
//! creation. Duplicate protection rules, group paths and members are
//! rejected with 409 like the real server.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use steward::gitlab::GitLabClient;
use steward::http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use url::Url;

pub const API: &str = "https://gitlab.test/api/v4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub push: u64,
    pub merge: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub id: u64,
    pub url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub key: String,
    pub value: String,
    pub scope: String,
}

#[derive(Debug, Default)]
struct Project {
    path: String,
    branches: Vec<(String, bool)>,
    protected: Vec<Rule>,
    protected_tags: Vec<String>,
    mirrors: Vec<Mirror>,
    variables: Vec<Variable>,
    cleanup_writes: usize,
    default_branch_writes: usize,
}

#[derive(Debug, Default)]
struct Group {
    path: String,
    visibility: String,
    parent_id: Option<u64>,
    request_access_enabled: bool,
    /// User id to access level.
    members: BTreeMap<u64, u64>,
}

impl Group {
    fn to_json(&self, id: u64) -> Value {
        json!({
            "id": id,
            "full_path": self.path,
            "visibility": self.visibility,
            "parent_id": self.parent_id,
            "request_access_enabled": self.request_access_enabled,
        })
    }
}

struct User {
    id: u64,
    username: String,
    note: Option<String>,
}

#[derive(Default)]
struct State {
    projects: BTreeMap<u64, Project>,
    groups: BTreeMap<u64, Group>,
    users: Vec<User>,
    failures: HashSet<(HttpMethod, String)>,
    requests: Vec<(HttpMethod, String)>,
    next_id: u64,
}

/// Cloneable handle to the fake server.
#[derive(Clone, Default)]
pub struct FakeGitLab {
    state: Arc<Mutex<State>>,
}

impl FakeGitLab {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().next_id = 1000;
        fake
    }

    /// A client over this fake that pages listings two at a time.
    pub fn client(&self) -> GitLabClient {
        GitLabClient::new_with_transport(API, "test-token", Arc::new(self.clone()))
            .unwrap()
            .with_per_page(2)
    }

    pub fn add_project(&self, id: u64, branches: &[(&str, bool)]) -> &Self {
        let project = Project {
            path: format!("group/project-{id}"),
            branches: branches
                .iter()
                .map(|(name, is_default)| (name.to_string(), *is_default))
                .collect(),
            ..Default::default()
        };
        self.state.lock().unwrap().projects.insert(id, project);
        self
    }

    pub fn add_mirror(&self, project_id: u64, mirror_id: u64, url: &str, enabled: bool) -> &Self {
        let mut state = self.state.lock().unwrap();
        let project = state.projects.get_mut(&project_id).unwrap();
        project.mirrors.push(Mirror {
            id: mirror_id,
            url: url.to_string(),
            enabled,
        });
        self
    }

    /// Add a root group whose `members` hold developer access.
    pub fn add_group(&self, id: u64, visibility: &str, members: &[u64]) -> &Self {
        let group = Group {
            path: format!("group-{id}"),
            visibility: visibility.to_string(),
            members: members.iter().map(|user| (*user, 30)).collect(),
            ..Default::default()
        };
        self.state.lock().unwrap().groups.insert(id, group);
        self
    }

    pub fn set_request_access(&self, group_id: u64, enabled: bool) -> &Self {
        self.state
            .lock()
            .unwrap()
            .groups
            .get_mut(&group_id)
            .unwrap()
            .request_access_enabled = enabled;
        self
    }

    pub fn add_user(&self, id: u64, username: &str) -> &Self {
        self.add_user_with_note(id, username, None)
    }

    pub fn add_user_with_note(&self, id: u64, username: &str, note: Option<&str>) -> &Self {
        self.state.lock().unwrap().users.push(User {
            id,
            username: username.to_string(),
            note: note.map(str::to_string),
        });
        self
    }

    pub fn add_variable(&self, project_id: u64, key: &str, value: &str, scope: &str) -> &Self {
        let mut state = self.state.lock().unwrap();
        let project = state.projects.get_mut(&project_id).unwrap();
        project.variables.push(Variable {
            key: key.to_string(),
            value: value.to_string(),
            scope: scope.to_string(),
        });
        self
    }

    /// Answer every `method` request to `path` (below the API root) with 500.
    pub fn fail(&self, method: HttpMethod, path: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((method, path.to_string()));
        self
    }

    pub fn rules(&self, project_id: u64) -> Vec<Rule> {
        self.state.lock().unwrap().projects[&project_id]
            .protected
            .clone()
    }

    pub fn rule(&self, project_id: u64, name: &str) -> Option<Rule> {
        self.rules(project_id).into_iter().find(|r| r.name == name)
    }

    pub fn default_branch(&self, project_id: u64) -> Option<String> {
        self.state.lock().unwrap().projects[&project_id]
            .branches
            .iter()
            .find(|(_, is_default)| *is_default)
            .map(|(name, _)| name.clone())
    }

    pub fn branches(&self, project_id: u64) -> Vec<String> {
        self.state.lock().unwrap().projects[&project_id]
            .branches
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn default_branch_writes(&self, project_id: u64) -> usize {
        self.state.lock().unwrap().projects[&project_id].default_branch_writes
    }

    pub fn cleanup_writes(&self, project_id: u64) -> usize {
        self.state.lock().unwrap().projects[&project_id].cleanup_writes
    }

    pub fn protected_tags(&self, project_id: u64) -> Vec<String> {
        self.state.lock().unwrap().projects[&project_id]
            .protected_tags
            .clone()
    }

    pub fn mirrors(&self, project_id: u64) -> Vec<Mirror> {
        self.state.lock().unwrap().projects[&project_id]
            .mirrors
            .clone()
    }

    pub fn members(&self, group_id: u64) -> Vec<u64> {
        self.state.lock().unwrap().groups[&group_id]
            .members
            .keys()
            .copied()
            .collect()
    }

    pub fn member_access(&self, group_id: u64, user_id: u64) -> Option<u64> {
        self.state.lock().unwrap().groups[&group_id]
            .members
            .get(&user_id)
            .copied()
    }

    pub fn group_ids(&self) -> Vec<u64> {
        self.state.lock().unwrap().groups.keys().copied().collect()
    }

    /// (path, visibility, parent id, access requests enabled) of a group.
    pub fn group(&self, group_id: u64) -> (String, String, Option<u64>, bool) {
        let state = self.state.lock().unwrap();
        let group = &state.groups[&group_id];
        (
            group.path.clone(),
            group.visibility.clone(),
            group.parent_id,
            group.request_access_enabled,
        )
    }

    pub fn variables(&self, project_id: u64) -> Vec<Variable> {
        self.state.lock().unwrap().projects[&project_id]
            .variables
            .clone()
    }

    pub fn project_ids(&self) -> Vec<u64> {
        self.state.lock().unwrap().projects.keys().copied().collect()
    }

    /// Every request received, as (method, path below the API root).
    pub fn requests(&self) -> Vec<(HttpMethod, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_matching(&self, method: HttpMethod, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }
}

fn respond(status: u16, body: Value) -> HttpResponse {
    HttpResponse::json(status, body.to_string())
}

fn not_found(what: &str) -> HttpResponse {
    respond(404, json!({ "message": format!("404 {what} Not Found") }))
}

/// Decode `%XX` escapes in a path segment.
fn decode_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// The requested page of `items`, using GitLab's default page size of 20.
fn page_of(items: Vec<Value>, url: &Url) -> Value {
    let page: usize = query_param(url, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = query_param(url, "per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(20);
    let start = (page.max(1) - 1) * per_page;
    Value::Array(items.into_iter().skip(start).take(per_page).collect())
}

fn paginate(ids: Vec<u64>, url: &Url) -> Value {
    page_of(ids.into_iter().map(|id| json!({ "id": id })).collect(), url)
}

impl State {
    fn route(&mut self, method: HttpMethod, segments: &[String], url: &Url, body: &Value) -> HttpResponse {
        let segs: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (method, segs.as_slice()) {
            (HttpMethod::Get, ["projects"]) => {
                respond(200, paginate(self.projects.keys().copied().collect(), url))
            }
            (HttpMethod::Get, ["groups"]) => {
                respond(200, paginate(self.groups.keys().copied().collect(), url))
            }
            (HttpMethod::Get, ["users"]) => {
                // The username filter matches loosely, like the real endpoint.
                let wanted = query_param(url, "username").unwrap_or_default().to_lowercase();
                let users: Vec<Value> = self
                    .users
                    .iter()
                    .filter(|u| u.username.to_lowercase().contains(&wanted))
                    .map(|u| {
                        json!({ "id": u.id, "username": u.username, "name": u.username, "note": u.note })
                    })
                    .collect();
                respond(200, page_of(users, url))
            }
            (HttpMethod::Post, ["groups"]) => {
                let path = body["path"].as_str().unwrap_or_default().to_string();
                let parent_id = body["parent_id"].as_u64();
                if parent_id.is_some_and(|p| !self.groups.contains_key(&p)) {
                    return not_found("Parent group");
                }
                if self
                    .groups
                    .values()
                    .any(|g| g.path == path && g.parent_id == parent_id)
                {
                    return respond(
                        409,
                        json!({ "message": "Failed to save group {:path=>[\"has already been taken\"]}" }),
                    );
                }
                self.next_id += 1;
                let id = self.next_id;
                let group = Group {
                    path,
                    visibility: body["visibility"].as_str().unwrap_or("private").to_string(),
                    parent_id,
                    request_access_enabled: body["request_access_enabled"].as_bool().unwrap_or(true),
                    members: BTreeMap::new(),
                };
                let created = group.to_json(id);
                self.groups.insert(id, group);
                respond(201, created)
            }
            (HttpMethod::Get, ["groups", id]) => {
                match id.parse::<u64>().ok().and_then(|id| self.groups.get(&id).map(|g| g.to_json(id))) {
                    Some(group) => respond(200, group),
                    None => not_found("Group"),
                }
            }
            (HttpMethod::Post, ["groups", group, "members"]) => {
                let Some(group) = group.parse::<u64>().ok().and_then(|id| self.groups.get_mut(&id))
                else {
                    return not_found("Group");
                };
                let user = body["user_id"].as_u64().unwrap_or_default();
                if group.members.contains_key(&user) {
                    return respond(409, json!({ "message": "Member already exists" }));
                }
                let access = body["access_level"].as_u64().unwrap_or_default();
                group.members.insert(user, access);
                respond(201, json!({ "id": user, "access_level": access }))
            }
            (HttpMethod::Delete, ["groups", group, "members", user]) => {
                let (Ok(group), Ok(user)) = (group.parse::<u64>(), user.parse::<u64>()) else {
                    return not_found("Member");
                };
                match self.groups.get_mut(&group) {
                    Some(group) => {
                        if group.members.remove(&user).is_some() {
                            respond(204, Value::Null)
                        } else {
                            not_found("Member")
                        }
                    }
                    None => not_found("Group"),
                }
            }
            (HttpMethod::Post, ["projects"]) => {
                self.next_id += 1;
                let id = self.next_id;
                let path = body["path"].as_str().unwrap_or_default().to_string();
                let default = body["default_branch"].as_str().unwrap_or("main").to_string();
                self.projects.insert(
                    id,
                    Project {
                        path: path.clone(),
                        branches: vec![(default.clone(), true)],
                        ..Default::default()
                    },
                );
                respond(
                    201,
                    json!({
                        "id": id,
                        "name": body["name"],
                        "path_with_namespace": format!("group/{path}"),
                        "default_branch": default,
                        "visibility": body["visibility"],
                    }),
                )
            }
            (_, ["projects", id, rest @ ..]) => {
                let Some(project) = id.parse::<u64>().ok().and_then(|id| self.projects.get_mut(&id))
                else {
                    return not_found("Project");
                };
                project_route(project, method, rest, url, body)
            }
            _ => not_found("Route"),
        }
    }
}

fn project_route(
    project: &mut Project,
    method: HttpMethod,
    rest: &[&str],
    url: &Url,
    body: &Value,
) -> HttpResponse {
    match (method, rest) {
        (HttpMethod::Put, []) => {
            if let Some(name) = body["default_branch"].as_str() {
                if !project.branches.iter().any(|(b, _)| b == name) {
                    return respond(400, json!({ "message": "Default branch does not exist" }));
                }
                for (branch, is_default) in &mut project.branches {
                    *is_default = *branch == name;
                }
                project.default_branch_writes += 1;
            }
            if body.get("container_expiration_policy_attributes").is_some() {
                project.cleanup_writes += 1;
            }
            respond(200, json!({ "path": project.path }))
        }
        (HttpMethod::Get, ["repository", "branches"]) => {
            let branches: Vec<Value> = project
                .branches
                .iter()
                .map(|(name, is_default)| json!({ "name": name, "default": is_default, "protected": false }))
                .collect();
            respond(200, Value::Array(branches))
        }
        (HttpMethod::Post, ["repository", "branches"]) => {
            let name = body["branch"].as_str().unwrap_or_default().to_string();
            let reference = body["ref"].as_str().unwrap_or_default();
            if !project.branches.iter().any(|(b, _)| b == reference) {
                return respond(400, json!({ "message": "Invalid reference name" }));
            }
            if project.branches.iter().any(|(b, _)| *b == name) {
                return respond(400, json!({ "message": "Branch already exists" }));
            }
            project.branches.push((name.clone(), false));
            respond(201, json!({ "name": name, "default": false }))
        }
        (HttpMethod::Delete, ["protected_branches", name]) => {
            let before = project.protected.len();
            project.protected.retain(|r| r.name != *name);
            if project.protected.len() == before {
                not_found("Protected branch")
            } else {
                respond(204, Value::Null)
            }
        }
        (HttpMethod::Post, ["protected_branches"]) => {
            let name = body["name"].as_str().unwrap_or_default().to_string();
            if project.protected.iter().any(|r| r.name == name) {
                return respond(409, json!({ "message": format!("Protected branch '{name}' already exists") }));
            }
            project.protected.push(Rule {
                name: name.clone(),
                push: body["push_access_level"].as_u64().unwrap_or(40),
                merge: body["merge_access_level"].as_u64().unwrap_or(40),
            });
            respond(201, json!({ "name": name }))
        }
        (HttpMethod::Delete, ["protected_tags", name]) => {
            let before = project.protected_tags.len();
            project.protected_tags.retain(|t| t != name);
            if project.protected_tags.len() == before {
                not_found("Protected tag")
            } else {
                respond(204, Value::Null)
            }
        }
        (HttpMethod::Post, ["protected_tags"]) => {
            let name = body["name"].as_str().unwrap_or_default().to_string();
            if project.protected_tags.contains(&name) {
                return respond(409, json!({ "message": "Protected tag already exists" }));
            }
            project.protected_tags.push(name.clone());
            respond(201, json!({ "name": name }))
        }
        (HttpMethod::Get, ["remote_mirrors"]) => {
            let mirrors: Vec<Value> = project
                .mirrors
                .iter()
                .map(|m| json!({ "id": m.id, "url": m.url, "enabled": m.enabled }))
                .collect();
            respond(200, Value::Array(mirrors))
        }
        (HttpMethod::Delete, ["remote_mirrors", id]) => {
            let before = project.mirrors.len();
            project.mirrors.retain(|m| m.id.to_string() != *id);
            if project.mirrors.len() == before {
                not_found("Remote mirror")
            } else {
                respond(204, Value::Null)
            }
        }
        (HttpMethod::Post, ["remote_mirrors"]) => {
            let id = project.mirrors.iter().map(|m| m.id).max().unwrap_or(0) + 1;
            project.mirrors.push(Mirror {
                id,
                url: body["url"].as_str().unwrap_or_default().to_string(),
                enabled: body["enabled"].as_bool().unwrap_or(false),
            });
            respond(201, json!({ "id": id }))
        }
        (HttpMethod::Get, ["variables"]) => {
            let variables: Vec<Value> = project
                .variables
                .iter()
                .map(|v| {
                    json!({
                        "key": v.key,
                        "value": v.value,
                        "environment_scope": v.scope,
                        "variable_type": "env_var",
                        "protected": false,
                        "masked": false,
                    })
                })
                .collect();
            respond(200, page_of(variables, url))
        }
        (HttpMethod::Delete, ["variables", key]) => {
            let scope = query_param(url, "filter[environment_scope]");
            let matching: Vec<usize> = project
                .variables
                .iter()
                .enumerate()
                .filter(|(_, v)| v.key == *key && scope.as_ref().is_none_or(|s| v.scope == *s))
                .map(|(i, _)| i)
                .collect();
            match matching.as_slice() {
                [] => not_found("Variable"),
                [index] => {
                    project.variables.remove(*index);
                    respond(204, Value::Null)
                }
                _ => respond(
                    409,
                    json!({ "message": "There are multiple variables with provided parameters. Please use 'filter[environment_scope]'" }),
                ),
            }
        }
        _ => not_found("Route"),
    }
}

#[async_trait]
impl HttpTransport for FakeGitLab {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = Url::parse(&request.url).map_err(|e| HttpError::Transport(e.to_string()))?;
        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.map(decode_segment).collect())
            .unwrap_or_default();
        // Drop the "api/v4" prefix.
        let segments: Vec<String> = segments.into_iter().skip(2).collect();
        let path = segments.join("/");

        let mut state = self.state.lock().unwrap();
        state.requests.push((request.method, path.clone()));

        if request.header("PRIVATE-TOKEN").is_none() {
            return Ok(respond(401, json!({ "message": "401 Unauthorized" })));
        }
        if state.failures.contains(&(request.method, path)) {
            return Ok(respond(500, json!({ "message": "500 Internal Server Error" })));
        }

        let body: Value = if request.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&request.body).map_err(|e| HttpError::Transport(e.to_string()))?
        };

        Ok(state.route(request.method, &segments, &url, &body))
    }
}
