//! Creating a new project already conforming to the branch policy.
//!
//! Unlike the fleet runs this is a single-entity sequence and fails fast: the
//! first failing step is returned as an error.

use std::collections::HashSet;

use super::error::{FleetError, Step, StepResultExt};
use super::mirror::MirrorTarget;
use super::mutations::{
    CleanupOutcome, apply_branch_policy, apply_cleanup_policy, set_default_branch, setup_protected_tag,
};
use super::plan::{
    BranchClassification, BranchInspection, DEVELOP_BRANCH, STAGING_BRANCH, plan,
};
use super::progress::{FleetProgress, ProgressCallback, emit};
use crate::gitlab::{GitLabProject, NewProject};
use crate::platform::FleetClient;

/// Used when neither the caller nor the namespace specify a visibility.
pub const FALLBACK_VISIBILITY: &str = "private";

/// Create `project` with the full develop → staging → default layout.
///
/// Sequence: resolve visibility (inherited from the namespace when unset) →
/// create project → create `staging` from the default branch and `develop`
/// from `staging` → set the default branch → protect all three tiers →
/// protect tags → apply the cleanup policy unless the new id is in
/// `cleanup_exclusions` → optionally add a push mirror named after the
/// project path.
pub async fn create_project<C: FleetClient + ?Sized>(
    client: &C,
    project: &NewProject,
    cleanup_exclusions: &HashSet<u64>,
    mirror: Option<&MirrorTarget>,
    on_progress: Option<&ProgressCallback>,
) -> Result<GitLabProject, FleetError> {
    let visibility = match &project.visibility {
        Some(v) => v.clone(),
        None => client
            .get_group(project.namespace_id)
            .await?
            .visibility
            .unwrap_or_else(|| FALLBACK_VISIBILITY.to_string()),
    };

    let created = client
        .create_project(project, &visibility)
        .await
        .at(Step::CreateProject)?;
    let id = created.id;
    let say = |text: String| emit(on_progress, FleetProgress::entity(id, text));
    say(format!(
        "Created {} ({visibility})",
        if created.path_with_namespace.is_empty() {
            project.path.as_str()
        } else {
            created.path_with_namespace.as_str()
        }
    ));

    for (branch, reference) in [
        (STAGING_BRANCH, project.default_branch.as_str()),
        (DEVELOP_BRANCH, STAGING_BRANCH),
    ] {
        client
            .create_branch(id, branch, reference)
            .await
            .at(Step::CreateBranch)?;
        say(format!("Created branch {branch} from {reference}"));
    }

    set_default_branch(client, id, &project.default_branch)
        .await
        .at(Step::SetDefaultBranch)?;
    say(format!("Default branch set to {}", project.default_branch));

    let full_layout = plan(&BranchInspection {
        classification: BranchClassification::from_code(
            BranchClassification::DEFAULT
                | BranchClassification::STAGING
                | BranchClassification::DEVELOP,
        ),
        default_branch: Some(project.default_branch.clone()),
    });
    for policy in &full_layout.branch_policies {
        apply_branch_policy(client, id, policy)
            .await
            .at(Step::ApplyBranchPolicy)?;
        say(format!("Protected {policy}"));
    }

    setup_protected_tag(client, id).await.at(Step::ProtectTags)?;
    say("Tag creation restricted to maintainers".to_string());

    match apply_cleanup_policy(client, id, cleanup_exclusions)
        .await
        .at(Step::ApplyCleanupPolicy)?
    {
        CleanupOutcome::Applied => say("Cleanup policy applied".to_string()),
        CleanupOutcome::Skipped => say("Cleanup policy skipped (excluded)".to_string()),
    }

    if let Some(target) = mirror {
        client
            .create_remote_mirror(id, &target.mirror_url(&project.path))
            .await
            .at(Step::CreateMirror)?;
        say(format!("Mirror configured for {}", project.path));
    }

    tracing::info!(project_id = id, "Project bootstrapped");
    Ok(created)
}
