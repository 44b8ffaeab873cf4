//! Listing and deleting a project's CI/CD variables by environment scope.

use std::collections::BTreeMap;

use super::error::{FleetError, Step, StepResultExt};
use super::progress::{FleetProgress, ProgressCallback, emit};
use crate::gitlab::{GitLabError, ProjectVariable};
use crate::platform::FleetClient;

/// Which variables an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Every variable regardless of scope.
    All,
    /// Variables whose scope is exactly this string.
    Exact(String),
}

impl ScopeFilter {
    /// `"all"` and `"*"` select every variable; anything else is matched
    /// exactly against the variable's environment scope.
    pub fn parse(scope: &str) -> Self {
        match scope.trim() {
            "all" | "*" => ScopeFilter::All,
            other => ScopeFilter::Exact(other.to_string()),
        }
    }

    pub fn matches(&self, variable: &ProjectVariable) -> bool {
        match self {
            ScopeFilter::All => true,
            ScopeFilter::Exact(scope) => variable.environment_scope == *scope,
        }
    }
}

impl std::fmt::Display for ScopeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeFilter::All => f.write_str("all environments"),
            ScopeFilter::Exact(scope) => write!(f, "environment {scope:?}"),
        }
    }
}

/// Fetch a project's variables, keeping those selected by `filter`.
pub async fn list_variables<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
    filter: &ScopeFilter,
) -> Result<Vec<ProjectVariable>, GitLabError> {
    let variables = client.list_project_variables(project_id).await?;
    let total = variables.len();
    let selected: Vec<ProjectVariable> = variables
        .into_iter()
        .filter(|v| filter.matches(v))
        .collect();
    tracing::debug!(project_id, total, selected = selected.len(), "Listed variables");
    Ok(selected)
}

/// Group variables by environment scope, scopes and keys in sorted order.
pub fn group_by_scope(variables: &[ProjectVariable]) -> BTreeMap<&str, Vec<&ProjectVariable>> {
    let mut grouped: BTreeMap<&str, Vec<&ProjectVariable>> = BTreeMap::new();
    for variable in variables {
        grouped
            .entry(variable.environment_scope.as_str())
            .or_default()
            .push(variable);
    }
    for entries in grouped.values_mut() {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
    }
    grouped
}

/// Delete every variable selected by `filter`, one at a time.
///
/// Each deletion targets the variable's own scope, so a key defined in
/// several scopes only loses the selected ones. Stops at the first failed
/// deletion; variables already deleted stay deleted.
pub async fn delete_variables<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
    filter: &ScopeFilter,
    on_progress: Option<&ProgressCallback>,
) -> Result<usize, FleetError> {
    let variables = list_variables(client, project_id, filter).await?;

    for variable in &variables {
        client
            .delete_project_variable(project_id, &variable.key, &variable.environment_scope)
            .await
            .at(Step::DeleteVariable)?;
        emit(
            on_progress,
            FleetProgress::entity(
                project_id,
                format!("Deleted {} [{}]", variable.key, variable.environment_scope),
            ),
        );
    }

    tracing::info!(project_id, deleted = variables.len(), %filter, "Variables deleted");
    Ok(variables.len())
}
