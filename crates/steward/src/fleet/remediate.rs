//! Bulk branch-policy remediation.
//!
//! Per project: fetch branches → classify → (stop on code 0) → set the
//! default branch → replace each protection rule → optionally protect tags →
//! apply the cleanup policy. The first failing step ends that project's task.

use std::collections::HashSet;
use std::sync::Arc;

use super::error::{FleetError, Step, StepFailure, StepResultExt};
use super::fanout::{EntityReporter, FanOutStats, run_all};
use super::mutations::{
    CleanupOutcome, apply_branch_policy, apply_cleanup_policy, set_default_branch,
    setup_protected_tag,
};
use super::plan::{inspect, plan};
use super::progress::ProgressCallback;
use crate::platform::{Collection, FleetClient};

/// Options for a remediation run.
#[derive(Debug, Clone, Default)]
pub struct RemediationOptions {
    /// Projects that must never receive the cleanup policy.
    pub cleanup_exclusions: HashSet<u64>,
    /// Also replace the wildcard protected-tag rule on every project.
    pub protect_tags: bool,
    /// In-flight task cap; `None` runs every project at once.
    pub concurrency: Option<usize>,
}

/// Remediate every project visible to the token.
///
/// Fails only if the project listing cannot be walked. Per-project failures
/// are reported through `on_progress` and counted in the returned stats.
pub async fn remediate_fleet<C>(
    client: &C,
    options: &RemediationOptions,
    on_progress: Option<Arc<ProgressCallback>>,
) -> Result<FanOutStats, FleetError>
where
    C: FleetClient + Clone + 'static,
{
    let projects = client
        .walk(Collection::Projects, on_progress.as_deref())
        .await?;

    tracing::info!(
        projects = projects.len(),
        concurrency = ?options.concurrency,
        "Starting branch-policy remediation"
    );

    let client = client.clone();
    let options = Arc::new(options.clone());
    let concurrency = options.concurrency;

    let stats = run_all(
        "remediate",
        projects,
        concurrency,
        on_progress,
        move |project, reporter| {
            let client = client.clone();
            let options = Arc::clone(&options);
            async move { remediate_project(&client, project.id, &options, &reporter).await }
        },
    )
    .await;

    Ok(stats)
}

/// Run the remediation state machine for one project.
pub async fn remediate_project<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
    options: &RemediationOptions,
    reporter: &EntityReporter,
) -> Result<(), StepFailure> {
    reporter.say("Updating project settings");

    let inspection = inspect(client, project_id).await.at(Step::FetchBranches)?;
    let plan = plan(&inspection);

    if plan.is_noop() {
        reporter.say("Skipped: no default, staging or develop branch");
        return Ok(());
    }

    if let Some(branch) = &plan.default_branch {
        set_default_branch(client, project_id, branch)
            .await
            .at(Step::SetDefaultBranch)?;
        reporter.say(format!("Default branch set to {branch}"));
    }

    for policy in &plan.branch_policies {
        apply_branch_policy(client, project_id, policy)
            .await
            .at(Step::ApplyBranchPolicy)?;
        reporter.say(format!("Protected {policy}"));
    }

    if options.protect_tags {
        setup_protected_tag(client, project_id)
            .await
            .at(Step::ProtectTags)?;
        reporter.say("Tag creation restricted to maintainers");
    }

    match apply_cleanup_policy(client, project_id, &options.cleanup_exclusions)
        .await
        .at(Step::ApplyCleanupPolicy)?
    {
        CleanupOutcome::Applied => reporter.say("Cleanup policy applied"),
        CleanupOutcome::Skipped => reporter.say("Cleanup policy skipped (excluded)"),
    }

    Ok(())
}
