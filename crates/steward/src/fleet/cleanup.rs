//! Stand-alone cleanup-policy runs, for one project or the whole fleet.

use std::collections::HashSet;
use std::sync::Arc;

use super::error::{FleetError, Step, StepFailure, StepResultExt};
use super::fanout::{EntityReporter, FanOutStats, run_all};
use super::mutations::{CleanupOutcome, apply_cleanup_policy};
use super::progress::ProgressCallback;
use crate::platform::{Collection, FleetClient};

#[derive(Debug, Clone, Default)]
pub struct CleanupOptions {
    pub exclusions: HashSet<u64>,
    pub concurrency: Option<usize>,
}

/// Apply the cleanup policy to every project except the excluded ones.
pub async fn cleanup_fleet<C>(
    client: &C,
    options: &CleanupOptions,
    on_progress: Option<Arc<ProgressCallback>>,
) -> Result<FanOutStats, FleetError>
where
    C: FleetClient + Clone + 'static,
{
    let projects = client
        .walk(Collection::Projects, on_progress.as_deref())
        .await?;

    let client = client.clone();
    let exclusions = Arc::new(options.exclusions.clone());

    Ok(run_all(
        "cleanup-policy",
        projects,
        options.concurrency,
        on_progress,
        move |project, reporter| {
            let client = client.clone();
            let exclusions = Arc::clone(&exclusions);
            async move {
                cleanup_project(&client, project.id, &exclusions, &reporter)
                    .await
                    .map(|_| ())
            }
        },
    )
    .await)
}

/// Apply the cleanup policy to a single project.
pub async fn cleanup_project<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
    exclusions: &HashSet<u64>,
    reporter: &EntityReporter,
) -> Result<CleanupOutcome, StepFailure> {
    let outcome = apply_cleanup_policy(client, project_id, exclusions)
        .await
        .at(Step::ApplyCleanupPolicy)?;

    match outcome {
        CleanupOutcome::Applied => reporter.say("Cleanup policy applied"),
        CleanupOutcome::Skipped => reporter.say("Cleanup policy skipped (excluded)"),
    }

    Ok(outcome)
}
