//! Fleet-wide operations.
//!
//! Every orchestrator follows the same shape: walk a collection to get the
//! base entity set (fatal on failure), then run a per-entity task for each
//! member, reporting progress as it goes. Per-entity failures are contained.
//!
//! # Module Structure
//!
//! - [`plan`] - Branch classification and the remediation decision table
//! - [`mutations`] - Idempotent project mutations
//! - [`fanout`] - Concurrent per-entity execution with failure isolation
//! - [`remediate`] - Bulk branch-policy remediation
//! - [`mirror`] - Sequential mirror resync
//! - [`deprovision`] - Group membership revocation
//! - [`cleanup`] - Cleanup-policy runs
//! - [`bootstrap`] - New-project creation
//! - [`groups`] - Group and subgroup creation
//! - [`variables`] - Project CI/CD variables by environment scope
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use steward::fleet::{RemediationOptions, remediate_fleet};
//! use steward::gitlab::GitLabClient;
//!
//! let client = GitLabClient::new(&api_url, &token)?;
//! let options = RemediationOptions { concurrency: Some(16), ..Default::default() };
//! let stats = remediate_fleet(&client, &options, None).await?;
//! println!("{} ok, {} failed", stats.succeeded, stats.failed.len());
//! ```

pub mod bootstrap;
pub mod cleanup;
pub mod deprovision;
mod error;
pub mod fanout;
pub mod groups;
pub mod mirror;
pub mod mutations;
pub mod plan;
mod progress;
pub mod remediate;
pub mod variables;

pub use error::{FleetError, Step, StepFailure, StepResultExt};
pub use progress::{FleetProgress, ProgressCallback, ProgressMessage, emit};

pub use bootstrap::create_project;
pub use cleanup::{CleanupOptions, cleanup_fleet, cleanup_project};
pub use deprovision::{DeprovisionOptions, deprovision_user, resolve_user};
pub use fanout::{EntityFailure, EntityReporter, FanOutStats, run_all};
pub use groups::{CreatedGroup, create_group, create_subgroup, slugify};
pub use mirror::{MirrorResyncStats, MirrorTarget, ResyncOutcome, resync_mirrors};
pub use mutations::CleanupOutcome;
pub use plan::{BranchClassification, BranchInspection, RemediationPlan, classify, plan};
pub use remediate::{RemediationOptions, remediate_fleet, remediate_project};
pub use variables::{ScopeFilter, delete_variables, group_by_scope, list_variables};
