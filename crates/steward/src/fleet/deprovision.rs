//! Removing a user from every group.

use std::sync::Arc;

use super::error::{FleetError, Step, StepFailure};
use super::fanout::{FanOutStats, run_all};
use super::progress::ProgressCallback;
use crate::gitlab::GitLabUser;
use crate::platform::{Collection, FleetClient};

#[derive(Debug, Clone, Default)]
pub struct DeprovisionOptions {
    /// In-flight task cap; `None` revokes from every group at once.
    pub concurrency: Option<usize>,
}

/// Resolve `username` to exactly one account.
///
/// The users endpoint matches loosely, so results are filtered to exact
/// (case-insensitive) username matches. Anything other than a single match
/// is an error: revoking the wrong account's access is not recoverable.
pub async fn resolve_user<C: FleetClient + ?Sized>(
    client: &C,
    username: &str,
) -> Result<GitLabUser, FleetError> {
    let mut matches: Vec<GitLabUser> = client
        .find_users(username)
        .await?
        .into_iter()
        .filter(|u| u.username.eq_ignore_ascii_case(username))
        .collect();

    match matches.len() {
        0 => Err(FleetError::UserNotFound(username.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(FleetError::AmbiguousUser {
            username: username.to_string(),
            count,
        }),
    }
}

/// Revoke `username`'s membership in every group visible to the token.
///
/// Returns the resolved user alongside the fan-out stats. A group the user
/// does not belong to counts as a success.
pub async fn deprovision_user<C>(
    client: &C,
    username: &str,
    options: &DeprovisionOptions,
    on_progress: Option<Arc<ProgressCallback>>,
) -> Result<(GitLabUser, FanOutStats), FleetError>
where
    C: FleetClient + Clone + 'static,
{
    let user = resolve_user(client, username).await?;
    let groups = client
        .walk(Collection::Groups, on_progress.as_deref())
        .await?;

    tracing::info!(
        user_id = user.id,
        username = %user.username,
        groups = groups.len(),
        "Revoking group memberships"
    );

    let client = client.clone();
    let user_id = user.id;

    let stats = run_all(
        "deprovision",
        groups,
        options.concurrency,
        on_progress,
        move |group, reporter| {
            let client = client.clone();
            async move {
                match client.remove_group_member(group.id, user_id).await {
                    Ok(()) => {
                        reporter.say(format!("Removed user #{user_id}"));
                        Ok(())
                    }
                    Err(e) if e.is_not_found() => {
                        reporter.say(format!("User #{user_id} is not a member"));
                        Ok(())
                    }
                    Err(error) => Err(StepFailure {
                        step: Step::RevokeMembership,
                        error,
                    }),
                }
            }
        },
    )
    .await;

    Ok((user, stats))
}
