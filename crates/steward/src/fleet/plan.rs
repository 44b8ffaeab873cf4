//! Branch inspection and the remediation decision table.
//!
//! A project's branch set is folded into a 3-bit [`BranchClassification`]
//! (default = 4, staging = 2, develop = 1) which [`plan`] maps to a default
//! branch choice and the protection rules to (re)create. The promotion order
//! is develop → staging → default: the most advanced tier present becomes the
//! default branch and is restricted to merge-only, tiers below it stay open
//! to direct pushes by developers.

use crate::gitlab::{AccessLevel, Branch, BranchPolicy, GitLabError};
use crate::platform::FleetClient;

pub const STAGING_BRANCH: &str = "staging";
pub const DEVELOP_BRANCH: &str = "develop";

/// Which of {default, staging, develop} a project has, as a code in `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BranchClassification(u8);

impl BranchClassification {
    pub const DEFAULT: u8 = 0b100;
    pub const STAGING: u8 = 0b010;
    pub const DEVELOP: u8 = 0b001;

    /// Build from a raw code. Bits above the three flags are dropped.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        Self(code & 0b111)
    }

    #[inline]
    pub fn code(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn has_default(self) -> bool {
        self.0 & Self::DEFAULT != 0
    }

    #[inline]
    pub fn has_staging(self) -> bool {
        self.0 & Self::STAGING != 0
    }

    #[inline]
    pub fn has_develop(self) -> bool {
        self.0 & Self::DEVELOP != 0
    }

    /// Code 0: nothing to remediate.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for BranchClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of folding a branch list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInspection {
    pub classification: BranchClassification,
    /// Name of the branch flagged as default, if any.
    pub default_branch: Option<String>,
}

/// What to do to one project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemediationPlan {
    pub default_branch: Option<String>,
    pub branch_policies: Vec<BranchPolicy>,
}

impl RemediationPlan {
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.default_branch.is_none() && self.branch_policies.is_empty()
    }
}

/// Fold a branch list into its classification.
///
/// Each bit is set on its own: a default branch named "staging" sets both
/// the default and the staging bit.
pub fn classify(branches: &[Branch]) -> BranchInspection {
    let mut code = 0u8;
    let mut default_branch = None;

    for branch in branches {
        if branch.is_default {
            code |= BranchClassification::DEFAULT;
            default_branch = Some(branch.name.clone());
        }
        if branch.name == STAGING_BRANCH {
            code |= BranchClassification::STAGING;
        }
        if branch.name == DEVELOP_BRANCH {
            code |= BranchClassification::DEVELOP;
        }
    }

    BranchInspection {
        classification: BranchClassification(code),
        default_branch,
    }
}

/// Keep one rule per branch name. Rules are applied in order, so a later
/// rule for the same branch replaces an earlier one.
fn collapse_duplicates(policies: Vec<BranchPolicy>) -> Vec<BranchPolicy> {
    let mut collapsed: Vec<BranchPolicy> = Vec::with_capacity(policies.len());
    for policy in policies {
        collapsed.retain(|p| p.name != policy.name);
        collapsed.push(policy);
    }
    collapsed
}

/// Map an inspection to its remediation plan.
pub fn plan(inspection: &BranchInspection) -> RemediationPlan {
    let class = inspection.classification;
    let open = |name: &str| BranchPolicy::new(name, AccessLevel::DEVELOPER, AccessLevel::DEVELOPER);

    let mut policies = Vec::new();
    let default_branch = match (class.has_default(), &inspection.default_branch) {
        (true, Some(name)) => {
            if class.code() == BranchClassification::DEFAULT {
                policies.push(open(name));
            } else {
                policies.push(BranchPolicy::new(
                    name.as_str(),
                    AccessLevel::NO_ACCESS,
                    AccessLevel::MAINTAINER,
                ));
            }
            Some(name.clone())
        }
        _ if class.has_staging() => Some(STAGING_BRANCH.to_string()),
        _ if class.has_develop() => Some(DEVELOP_BRANCH.to_string()),
        _ => None,
    };

    if class.has_staging() {
        if class.has_develop() {
            policies.push(BranchPolicy::new(
                STAGING_BRANCH,
                AccessLevel::NO_ACCESS,
                AccessLevel::DEVELOPER,
            ));
        } else {
            policies.push(open(STAGING_BRANCH));
        }
    }

    if class.has_develop() {
        policies.push(open(DEVELOP_BRANCH));
    }

    RemediationPlan {
        default_branch,
        branch_policies: collapse_duplicates(policies),
    }
}

/// Fetch a project's branches and classify them.
pub async fn inspect<C: FleetClient + ?Sized>(
    client: &C,
    project_id: u64,
) -> Result<BranchInspection, GitLabError> {
    let branches = client.list_branches(project_id).await?;
    let inspection = classify(&branches);
    tracing::debug!(
        project_id,
        code = inspection.classification.code(),
        default_branch = ?inspection.default_branch,
        "Classified branches"
    );
    Ok(inspection)
}
