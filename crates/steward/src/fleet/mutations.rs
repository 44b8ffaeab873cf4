//! Idempotent project mutations.
//!
//! Each primitive can be re-run against a project in any state and converges
//! on the same end state. Protection rules are not idempotent at the API (a
//! second create conflicts), so they are always deleted before being created.

use std::collections::HashSet;

use crate::gitlab::{BranchPolicy, GitLabError, PROTECTED_TAG_PATTERN};
use crate::platform::FleetClient;

/// Whether the cleanup policy was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Applied,
    /// The project is on the exclusion list; no request was made.
    Skipped,
}

/// Make `branch` the project's default branch.
pub async fn set_default_branch<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
    branch: &str,
) -> Result<(), GitLabError> {
    client.set_default_branch(project_id, branch).await
}

/// Replace the protection rule for `policy.name` with `policy`.
///
/// A missing rule is fine; any other failure to delete aborts before the
/// create so a stale rule is never left next to a new one.
pub async fn apply_branch_policy<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
    policy: &BranchPolicy,
) -> Result<(), GitLabError> {
    ignore_not_found(client.unprotect_branch(project_id, &policy.name).await)?;
    client.protect_branch(project_id, policy).await
}

/// Write the fixed container retention policy unless the project is excluded.
pub async fn apply_cleanup_policy<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
    exclusions: &HashSet<u64>,
) -> Result<CleanupOutcome, GitLabError> {
    if exclusions.contains(&project_id) {
        tracing::debug!(project_id, "Project excluded from cleanup policy");
        return Ok(CleanupOutcome::Skipped);
    }

    client.update_cleanup_policy(project_id).await?;
    Ok(CleanupOutcome::Applied)
}

/// Restrict tag creation to maintainers for every tag.
pub async fn setup_protected_tag<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
) -> Result<(), GitLabError> {
    ignore_not_found(client.unprotect_tag(project_id, PROTECTED_TAG_PATTERN).await)?;
    client.protect_tag(project_id).await
}

#[inline]
fn ignore_not_found(result: Result<(), GitLabError>) -> Result<(), GitLabError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
