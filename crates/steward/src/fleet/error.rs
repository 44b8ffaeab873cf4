//! Fleet-level error types.
//!
//! Two granularities: [`FleetError`] aborts a whole orchestration (the base
//! entity set could not be established), [`StepFailure`] ends one entity's
//! task and is reported as progress.

use thiserror::Error;

use crate::gitlab::GitLabError;

/// Named steps of the per-entity state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    FetchBranches,
    SetDefaultBranch,
    ApplyBranchPolicy,
    ApplyCleanupPolicy,
    ProtectTags,
    InspectMirrors,
    DeleteMirror,
    CreateMirror,
    RevokeMembership,
    CreateProject,
    CreateBranch,
    CreateGroup,
    SeedMembers,
    DeleteVariable,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::FetchBranches => "fetch branches",
            Step::SetDefaultBranch => "set default branch",
            Step::ApplyBranchPolicy => "apply branch policy",
            Step::ApplyCleanupPolicy => "apply cleanup policy",
            Step::ProtectTags => "protect tags",
            Step::InspectMirrors => "inspect mirrors",
            Step::DeleteMirror => "delete mirror",
            Step::CreateMirror => "create mirror",
            Step::RevokeMembership => "revoke membership",
            Step::CreateProject => "create project",
            Step::CreateBranch => "create branch",
            Step::CreateGroup => "create group",
            Step::SeedMembers => "seed members",
            Step::DeleteVariable => "delete variable",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step of an entity's task failed.
#[derive(Debug, Error)]
#[error("{step} failed: {error}")]
pub struct StepFailure {
    pub step: Step,
    #[source]
    pub error: GitLabError,
}

/// Tag a client result with the step it belongs to.
pub trait StepResultExt<T> {
    fn at(self, step: Step) -> Result<T, StepFailure>;
}

impl<T> StepResultExt<T> for Result<T, GitLabError> {
    #[inline]
    fn at(self, step: Step) -> Result<T, StepFailure> {
        self.map_err(|error| StepFailure { step, error })
    }
}

/// Errors that abort an orchestration before or instead of fan-out.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    GitLab(#[from] GitLabError),

    #[error("No user named {0:?}")]
    UserNotFound(String),

    #[error("Username {username:?} matched {count} users")]
    AmbiguousUser { username: String, count: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Step(#[from] StepFailure),
}
