//! Integration tests for group and subgroup creation.

mod support;

use std::sync::{Arc, Mutex};

use steward::fleet::{FleetError, FleetProgress, ProgressCallback, Step, create_group, create_subgroup};
use steward::gitlab::GitLabError;
use steward::http::HttpMethod;
use support::FakeGitLab;

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<FleetProgress>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let capture = Arc::clone(&events);
    let callback: ProgressCallback = Box::new(move |event| {
        capture.lock().unwrap().push(event);
    });
    (callback, events)
}

/// Six accounts, four of them tagged as default members.
fn tagged_users() -> FakeGitLab {
    let fake = FakeGitLab::new();
    fake.add_user_with_note(1, "ada", Some("default_group_member_owner"))
        .add_user_with_note(2, "bob", Some("default_group_member_developer"))
        .add_user_with_note(3, "carol", Some("Default_Group_Member_Maintainer"))
        .add_user(4, "dave")
        .add_user_with_note(5, "eve", Some("default_group_member"))
        .add_user_with_note(6, "frank", Some("on leave"));
    fake
}

#[tokio::test]
async fn test_root_group_is_seeded_with_default_members() {
    let fake = tagged_users();

    let created = create_group(&fake.client(), "Data Platform", None, "internal", None)
        .await
        .unwrap();

    let id = created.group.id;
    assert_eq!(created.members_added, 4);
    assert_eq!(
        fake.group(id),
        ("data-platform".to_string(), "internal".to_string(), None, false)
    );
    assert_eq!(fake.members(id), vec![1, 2, 3, 5]);
    assert_eq!(fake.member_access(id, 1), Some(50));
    assert_eq!(fake.member_access(id, 2), Some(30));
    assert_eq!(fake.member_access(id, 3), Some(40));
    assert_eq!(fake.member_access(id, 5), Some(50));

    // The user listing was paged through, two at a time.
    assert!(fake.requests_matching(HttpMethod::Get, "users") >= 3);
}

#[tokio::test]
async fn test_taken_group_path_is_a_conflict() {
    let fake = tagged_users();
    fake.add_group(5, "private", &[]);

    let err = create_group(&fake.client(), "Group Five", Some("group-5"), "private", None)
        .await
        .unwrap_err();

    match err {
        FleetError::Step(failure) => {
            assert_eq!(failure.step, Step::CreateGroup);
            assert!(matches!(failure.error, GitLabError::Conflict(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fake.group_ids(), vec![5]);
    assert_eq!(fake.requests_matching(HttpMethod::Get, "users"), 0);
}

#[tokio::test]
async fn test_failed_member_add_is_a_warning() {
    let fake = tagged_users();
    fake.fail(HttpMethod::Post, "groups/1001/members");
    let (callback, events) = recorder();

    let created = create_group(&fake.client(), "Ops", None, "private", Some(&callback))
        .await
        .unwrap();

    assert_eq!(created.group.id, 1001);
    assert_eq!(created.members_added, 0);
    assert!(fake.members(1001).is_empty());

    let events = events.lock().unwrap();
    let warnings = events
        .iter()
        .filter(|e| matches!(e, FleetProgress::Warning { .. }))
        .count();
    assert_eq!(warnings, 4);
}

#[tokio::test]
async fn test_user_listing_failure_is_reported_after_creation() {
    let fake = tagged_users();
    fake.fail(HttpMethod::Get, "users");

    let err = create_group(&fake.client(), "Ops", None, "private", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FleetError::Step(ref failure) if failure.step == Step::SeedMembers
    ));
    assert_eq!(fake.group_ids(), vec![1001]);
}

#[tokio::test]
async fn test_subgroup_inherits_parent_settings_without_seeding() {
    let fake = tagged_users();
    fake.add_group(10, "internal", &[]).set_request_access(10, true);

    let created = create_subgroup(&fake.client(), "Billing API", None, 10, None)
        .await
        .unwrap();

    let id = created.group.id;
    assert_eq!(created.members_added, 0);
    assert_eq!(
        fake.group(id),
        ("billing-api".to_string(), "internal".to_string(), Some(10), true)
    );
    assert!(fake.members(id).is_empty());
    assert_eq!(fake.requests_matching(HttpMethod::Get, "users"), 0);
}

#[tokio::test]
async fn test_subgroup_of_missing_parent_creates_nothing() {
    let fake = FakeGitLab::new();

    let err = create_subgroup(&fake.client(), "Orphan", None, 404, None)
        .await
        .unwrap_err();

    assert!(matches!(err, FleetError::GitLab(ref e) if e.is_not_found()));
    assert_eq!(fake.requests_matching(HttpMethod::Post, "groups"), 0);
}

#[tokio::test]
async fn test_blank_name_is_rejected_before_any_request() {
    let fake = FakeGitLab::new();

    let err = create_group(&fake.client(), "  ", None, "private", None)
        .await
        .unwrap_err();

    assert!(matches!(err, FleetError::InvalidInput(_)));
    assert!(fake.requests().is_empty());
}
