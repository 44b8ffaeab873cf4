use std::sync::Arc;

use console::style;
use steward::fleet::{
    CleanupOptions, CleanupOutcome, CreatedGroup, DeprovisionOptions, EntityReporter,
    RemediationOptions, ScopeFilter, cleanup_fleet, cleanup_project, create_group,
    create_project, create_subgroup, delete_variables, deprovision_user, list_variables,
    remediate_fleet, resync_mirrors,
};
use steward::gitlab::NewProject;

use crate::GitlabAction;
use crate::commands::shared::{confirm, gitlab_client};
use crate::commands::summary::RunSummary;
use crate::commands::variables::render_variables;
use crate::config;
use crate::progress::ProgressReporter;

pub(crate) async fn handle_gitlab(
    action: GitlabAction,
    config: &config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = gitlab_client(config)?;
    tracing::debug!(api_url = client.api_url(), "Using GitLab API");

    match action {
        GitlabAction::Bulk {
            concurrency,
            protect_tags,
            yes,
            output,
        } => {
            if !confirm(
                "update branch protection, default branch and cleanup policy on every project",
                yes,
            )? {
                return Ok(());
            }

            let options = RemediationOptions {
                cleanup_exclusions: config.cleanup_exclusions(),
                protect_tags,
                concurrency: config.concurrency(concurrency),
            };

            let reporter = Arc::new(ProgressReporter::new());
            let stats = remediate_fleet(&client, &options, Some(reporter.as_callback())).await;
            reporter.finish();

            RunSummary::from_fan_out("remediate", &stats?).print(output)?;
        }

        GitlabAction::Mirroring { yes, output } => {
            let target = config.mirror_target().ok_or(
                "mirror target is not configured: set gitlab.mirror.username, token and group_path",
            )?;

            if !confirm(
                &format!(
                    "recreate the push mirror of every project against {}",
                    target.group_path
                ),
                yes,
            )? {
                return Ok(());
            }

            let reporter = Arc::new(ProgressReporter::new());
            let callback = reporter.as_callback();
            let stats = resync_mirrors(&client, &target, Some(callback.as_ref())).await;
            reporter.finish();

            RunSummary::from_resync(&stats?).print(output)?;
        }

        GitlabAction::Deprovision {
            username,
            concurrency,
            yes,
            output,
        } => {
            if !confirm(
                &format!("remove {} from every group", style(&username).cyan()),
                yes,
            )? {
                return Ok(());
            }

            let options = DeprovisionOptions {
                concurrency: config.concurrency(concurrency),
            };

            let reporter = Arc::new(ProgressReporter::new());
            let result =
                deprovision_user(&client, &username, &options, Some(reporter.as_callback())).await;
            reporter.finish();

            let (user, stats) = result?;
            tracing::info!(user_id = user.id, username = %user.username, "Deprovisioned user");
            RunSummary::from_fan_out("deprovision", &stats).print(output)?;
        }

        GitlabAction::CleanupPolicy {
            project_id: Some(project_id),
            ..
        } => {
            let exclusions = config.cleanup_exclusions();
            let reporter = Arc::new(ProgressReporter::new());
            let entity = EntityReporter::new(project_id, Some(reporter.as_callback()));
            let outcome = cleanup_project(&client, project_id, &exclusions, &entity).await;
            reporter.finish();

            match outcome? {
                CleanupOutcome::Applied => println!(
                    "{} Cleanup policy applied to project #{}",
                    style("✓").green().bold(),
                    project_id
                ),
                CleanupOutcome::Skipped => println!(
                    "{} Project #{} is excluded from cleanup policies",
                    style("·").dim(),
                    project_id
                ),
            }
        }

        GitlabAction::CleanupPolicy {
            project_id: None,
            concurrency,
            output,
        } => {
            let options = CleanupOptions {
                exclusions: config.cleanup_exclusions(),
                concurrency: config.concurrency(concurrency),
            };

            let reporter = Arc::new(ProgressReporter::new());
            let stats = cleanup_fleet(&client, &options, Some(reporter.as_callback())).await;
            reporter.finish();

            RunSummary::from_fan_out("cleanup", &stats?).print(output)?;
        }

        GitlabAction::CreateProject {
            name,
            path,
            namespace_id,
            default_branch,
            visibility,
            shared_runners,
            mirror,
        } => {
            let target = if mirror {
                Some(config.mirror_target().ok_or(
                    "--mirror requires gitlab.mirror.username, token and group_path",
                )?)
            } else {
                None
            };

            let project = NewProject {
                name,
                path,
                namespace_id,
                visibility,
                default_branch,
                shared_runners,
            };

            let reporter = Arc::new(ProgressReporter::new());
            let callback = reporter.as_callback();
            let created = create_project(
                &client,
                &project,
                &config.cleanup_exclusions(),
                target.as_ref(),
                Some(callback.as_ref()),
            )
            .await;
            reporter.finish();

            let created = created?;
            println!(
                "{} Created project #{} {}",
                style("✓").green().bold(),
                created.id,
                style(&created.path_with_namespace).cyan()
            );
        }

        GitlabAction::CreateGroup {
            name,
            path,
            visibility,
        } => {
            let reporter = Arc::new(ProgressReporter::new());
            let callback = reporter.as_callback();
            let created = create_group(
                &client,
                &name,
                path.as_deref(),
                &visibility,
                Some(callback.as_ref()),
            )
            .await;
            reporter.finish();

            print_created_group(&created?);
        }

        GitlabAction::CreateSubgroup { name, path, parent } => {
            let parent_id = config.parent_group(parent).ok_or(
                "no parent group: pass --parent or set gitlab.group_id",
            )?;

            let reporter = Arc::new(ProgressReporter::new());
            let callback = reporter.as_callback();
            let created = create_subgroup(
                &client,
                &name,
                path.as_deref(),
                parent_id,
                Some(callback.as_ref()),
            )
            .await;
            reporter.finish();

            print_created_group(&created?);
        }

        GitlabAction::ListEnvs {
            project_id,
            env,
            output,
        } => {
            let variables = list_variables(&client, project_id, &ScopeFilter::parse(&env)).await?;
            println!("{}", render_variables(project_id, &variables, output)?);
        }

        GitlabAction::DeleteEnvs {
            project_id,
            env,
            yes,
        } => {
            let filter = ScopeFilter::parse(&env);
            if !confirm(
                &format!("delete the {} variables of project #{}", filter, project_id),
                yes,
            )? {
                return Ok(());
            }

            let reporter = Arc::new(ProgressReporter::new());
            let callback = reporter.as_callback();
            let deleted =
                delete_variables(&client, project_id, &filter, Some(callback.as_ref())).await;
            reporter.finish();

            println!(
                "{} Deleted {} variables from project #{}",
                style("✓").green().bold(),
                deleted?,
                project_id
            );
        }
    }

    Ok(())
}

fn print_created_group(created: &CreatedGroup) {
    println!(
        "{} Created group #{} {} ({} default members)",
        style("✓").green().bold(),
        created.group.id,
        style(&created.group.full_path).cyan(),
        created.members_added
    );
}
