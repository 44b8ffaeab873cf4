//! Group and subgroup creation.
//!
//! Root groups are seeded with the accounts tagged as default members: an
//! admin marks a user by setting their note to one of the
//! [`DEFAULT_MEMBER_TIERS`] tags. Subgroups are not seeded since GitLab
//! already extends parent membership to them; instead they inherit the
//! parent's visibility and access-request setting.

use super::error::{FleetError, Step, StepResultExt};
use super::progress::{FleetProgress, ProgressCallback, emit};
use crate::gitlab::{AccessLevel, GitLabGroup, GitLabUser, NewGroup, short_error_message};
use crate::platform::FleetClient;

/// Visibility of a subgroup whose parent reports none.
pub const FALLBACK_GROUP_VISIBILITY: &str = "private";

/// A user-note tag and the access level it grants on new root groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultMemberTier {
    pub note: &'static str,
    pub access_level: AccessLevel,
}

pub const DEFAULT_MEMBER_TIERS: [DefaultMemberTier; 4] = [
    DefaultMemberTier {
        note: "default_group_member_developer",
        access_level: AccessLevel::DEVELOPER,
    },
    DefaultMemberTier {
        note: "default_group_member_maintainer",
        access_level: AccessLevel::MAINTAINER,
    },
    DefaultMemberTier {
        note: "default_group_member_owner",
        access_level: AccessLevel::OWNER,
    },
    DefaultMemberTier {
        note: "default_group_member",
        access_level: AccessLevel::OWNER,
    },
];

/// A freshly created group.
#[derive(Debug, Clone)]
pub struct CreatedGroup {
    pub group: GitLabGroup,
    /// Default members successfully added. Always 0 for subgroups.
    pub members_added: usize,
}

/// URL path derived from a display name: lowercase ASCII alphanumerics,
/// every other run of characters collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// The tier a user's note assigns them to, if any.
pub fn default_tier(user: &GitLabUser) -> Option<DefaultMemberTier> {
    let note = user.note.as_deref()?.trim();
    DEFAULT_MEMBER_TIERS
        .into_iter()
        .find(|tier| tier.note.eq_ignore_ascii_case(note))
}

fn resolve_path(name: &str, path: Option<&str>) -> Result<String, FleetError> {
    let path = match path {
        Some(p) => p.trim().to_string(),
        None => slugify(name),
    };
    if name.trim().is_empty() || path.is_empty() {
        return Err(FleetError::InvalidInput(
            "group name and path must not be empty".to_string(),
        ));
    }
    Ok(path)
}

/// Create a root group and seed it with the default members.
///
/// A path taken by another group surfaces as a `Conflict` error from the
/// create step. Failing to list users aborts seeding with an error; failing
/// to add one member is reported as a warning and seeding continues.
pub async fn create_group<C: FleetClient + ?Sized>(
    client: &C,
    name: &str,
    path: Option<&str>,
    visibility: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<CreatedGroup, FleetError> {
    let request = NewGroup {
        name: name.trim().to_string(),
        path: resolve_path(name, path)?,
        parent_id: None,
        visibility: visibility.to_string(),
        request_access_enabled: false,
    };

    let group = client
        .create_group(&request)
        .await
        .at(Step::CreateGroup)?;
    emit(
        on_progress,
        FleetProgress::entity(group.id, format!("Created group {}", request.path)),
    );

    let users = client.list_users().await.at(Step::SeedMembers)?;
    let mut members_added = 0;

    for (user, tier) in users
        .iter()
        .filter_map(|user| default_tier(user).map(|tier| (user, tier)))
    {
        match client
            .add_group_member(group.id, user.id, tier.access_level)
            .await
        {
            Ok(()) => {
                members_added += 1;
                emit(
                    on_progress,
                    FleetProgress::entity(
                        group.id,
                        format!("Added {} (access {})", user.username, tier.access_level),
                    ),
                );
            }
            Err(e) => emit(
                on_progress,
                FleetProgress::Warning {
                    message: format!(
                        "Group #{}: could not add {}: {}",
                        group.id,
                        user.username,
                        short_error_message(&e)
                    ),
                },
            ),
        }
    }

    tracing::info!(group_id = group.id, members_added, "Group created");
    Ok(CreatedGroup {
        group,
        members_added,
    })
}

/// Create a subgroup of `parent_id`, inheriting the parent's visibility and
/// access-request setting.
pub async fn create_subgroup<C: FleetClient + ?Sized>(
    client: &C,
    name: &str,
    path: Option<&str>,
    parent_id: u64,
    on_progress: Option<&ProgressCallback>,
) -> Result<CreatedGroup, FleetError> {
    let path = resolve_path(name, path)?;
    let parent = client.get_group(parent_id).await?;

    let request = NewGroup {
        name: name.trim().to_string(),
        path,
        parent_id: Some(parent.id),
        visibility: parent
            .visibility
            .unwrap_or_else(|| FALLBACK_GROUP_VISIBILITY.to_string()),
        request_access_enabled: parent.request_access_enabled,
    };

    let group = client
        .create_group(&request)
        .await
        .at(Step::CreateGroup)?;
    emit(
        on_progress,
        FleetProgress::entity(
            group.id,
            format!("Created subgroup {} under #{parent_id}", request.path),
        ),
    );

    tracing::info!(group_id = group.id, parent_id, "Subgroup created");
    Ok(CreatedGroup {
        group,
        members_added: 0,
    })
}
