//! Remote mirror resynchronization.
//!
//! Projects are processed one at a time. For each project with an enabled
//! mirror, the repository name is read from the mirror URL, the mirror is
//! deleted and a new one is created against the configured target with the
//! current credentials.

use super::error::{FleetError, Step, StepFailure, StepResultExt};
use super::fanout::EntityFailure;
use super::progress::{FleetProgress, ProgressCallback, emit};
use crate::gitlab::short_error_message;
use crate::platform::{Collection, FleetClient};

/// Where recreated mirrors push to.
#[derive(Clone)]
pub struct MirrorTarget {
    pub username: String,
    pub token: String,
    /// Host and group path, e.g. "gitlab.example.com/backups".
    pub group_path: String,
}

impl std::fmt::Debug for MirrorTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorTarget")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("group_path", &self.group_path)
            .finish()
    }
}

impl MirrorTarget {
    /// Authenticated push URL for repository `name`.
    pub fn mirror_url(&self, name: &str) -> String {
        format!(
            "https://{}:{}@{}/{}.git",
            self.username,
            self.token,
            self.group_path.trim_matches('/'),
            name
        )
    }
}

/// Extract the repository name from a mirror URL: the last path segment,
/// which must end in `.git` and have a non-empty stem.
pub fn project_name_from_url(url: &str) -> Option<&str> {
    let last = url.rsplit('/').next()?;
    let name = last.strip_suffix(".git")?;
    (!name.is_empty()).then_some(name)
}

/// What happened to one project during a resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// Mirror deleted and recreated for this repository name.
    Resynced { name: String },
    /// No enabled mirror on the project.
    NoMirror,
    /// The enabled mirror's URL has no recognizable name; left untouched.
    UnparseableUrl { url: String },
}

#[derive(Debug, Clone, Default)]
pub struct MirrorResyncStats {
    pub resynced: usize,
    pub skipped: usize,
    pub failed: Vec<EntityFailure>,
}

/// Resync the enabled mirror of every project, sequentially.
///
/// Only the initial project walk is fatal; a failure on one project is
/// reported and the loop moves on. Every walked project produces exactly one
/// `Entity` or `EntityFailed` event.
pub async fn resync_mirrors<C: FleetClient + ?Sized>(
    client: &C,
    target: &MirrorTarget,
    on_progress: Option<&ProgressCallback>,
) -> Result<MirrorResyncStats, FleetError> {
    let projects = client.walk(Collection::Projects, on_progress).await?;
    let mut stats = MirrorResyncStats::default();

    emit(
        on_progress,
        FleetProgress::ResyncStarted {
            count: projects.len(),
        },
    );

    for project in projects {
        match resync_project(client, project.id, target).await {
            Ok(ResyncOutcome::Resynced { name }) => {
                stats.resynced += 1;
                emit(
                    on_progress,
                    FleetProgress::entity(project.id, format!("Mirroring updated for {name}")),
                );
            }
            Ok(ResyncOutcome::NoMirror) => {
                stats.skipped += 1;
                emit(
                    on_progress,
                    FleetProgress::entity(project.id, "No enabled mirror"),
                );
            }
            Ok(ResyncOutcome::UnparseableUrl { url }) => {
                stats.skipped += 1;
                emit(
                    on_progress,
                    FleetProgress::Warning {
                        message: format!(
                            "Project #{}: mirror URL {} has no <name>.git suffix; left as is",
                            project.id,
                            redact_credentials(&url)
                        ),
                    },
                );
                emit(
                    on_progress,
                    FleetProgress::entity(project.id, "Mirror left as is"),
                );
            }
            Err(failure) => {
                let error = short_error_message(&failure.error);
                emit(
                    on_progress,
                    FleetProgress::EntityFailed {
                        entity_id: project.id,
                        step: Some(failure.step),
                        error: error.clone(),
                    },
                );
                stats.failed.push(EntityFailure {
                    entity_id: project.id,
                    step: Some(failure.step),
                    error,
                });
            }
        }
    }

    emit(
        on_progress,
        FleetProgress::ResyncComplete {
            resynced: stats.resynced,
            skipped: stats.skipped,
            failed: stats.failed.len(),
        },
    );

    Ok(stats)
}

/// Delete and recreate the first enabled mirror of one project.
pub async fn resync_project<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
    target: &MirrorTarget,
) -> Result<ResyncOutcome, StepFailure> {
    let mirrors = client
        .list_remote_mirrors(project_id)
        .await
        .at(Step::InspectMirrors)?;

    let Some(mirror) = mirrors.into_iter().find(|m| m.enabled) else {
        return Ok(ResyncOutcome::NoMirror);
    };

    let Some(name) = project_name_from_url(&mirror.url).map(str::to_string) else {
        return Ok(ResyncOutcome::UnparseableUrl { url: mirror.url });
    };

    client
        .delete_remote_mirror(project_id, mirror.id)
        .await
        .at(Step::DeleteMirror)?;
    client
        .create_remote_mirror(project_id, &target.mirror_url(&name))
        .await
        .at(Step::CreateMirror)?;

    Ok(ResyncOutcome::Resynced { name })
}

/// Replace `user:token@` in a URL with `*****@` for display.
fn redact_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}*****{}", &url[..scheme + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
