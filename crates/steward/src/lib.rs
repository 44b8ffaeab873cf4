//! Steward - policy reconciliation and bulk administration for a GitLab fleet.
//!
//! This library walks every project or group visible to a token and brings
//! each one in line with a fixed policy: a develop → staging → default branch
//! promotion model with matching protection rules, a container retention
//! policy, protected tags and push mirrors. It also revokes a departing
//! user's group memberships across the whole instance.
//!
//! Fleet runs are best-effort: each entity is handled by its own task, and a
//! failure is reported through [`fleet::FleetProgress`] without affecting any
//! other entity.
//!
//! # Example
//!
//! ```ignore
//! use steward::fleet::{RemediationOptions, remediate_fleet};
//! use steward::gitlab::GitLabClient;
//!
//! let client = GitLabClient::new("https://gitlab.example.com/api/v4", &token)?;
//! let options = RemediationOptions {
//!     cleanup_exclusions: [1234].into(),
//!     ..Default::default()
//! };
//! let stats = remediate_fleet(&client, &options, None).await?;
//! ```

pub mod fleet;
pub mod gitlab;
pub mod http;
pub mod platform;

pub use fleet::{FleetError, FleetProgress, ProgressCallback};
pub use gitlab::{GitLabClient, GitLabError};
pub use platform::{Collection, FleetClient};
