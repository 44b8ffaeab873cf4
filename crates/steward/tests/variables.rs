//! Integration tests for listing and deleting project variables.

mod support;

use steward::fleet::{FleetError, ScopeFilter, Step, delete_variables, list_variables};
use steward::http::HttpMethod;
use support::FakeGitLab;

/// One project with a key defined in two scopes and more variables than
/// fit on one page.
fn project_with_variables() -> FakeGitLab {
    let fake = FakeGitLab::new();
    fake.add_project(1, &[("main", true)])
        .add_variable(1, "API_KEY", "prod-key", "production")
        .add_variable(1, "API_KEY", "staging-key", "staging")
        .add_variable(1, "LOG_LEVEL", "info", "*")
        .add_variable(1, "DATABASE_URL", "postgres://staging", "staging")
        .add_variable(1, "SENTRY_DSN", "https://sentry", "production");
    fake
}

fn keys_and_scopes(fake: &FakeGitLab) -> Vec<(String, String)> {
    fake.variables(1)
        .into_iter()
        .map(|v| (v.key, v.scope))
        .collect()
}

#[tokio::test]
async fn test_list_all_walks_every_page() {
    let fake = project_with_variables();

    let all = list_variables(&fake.client(), 1, &ScopeFilter::parse("*"))
        .await
        .unwrap();

    assert_eq!(all.len(), 5);
    assert_eq!(fake.requests_matching(HttpMethod::Get, "projects/1/variables"), 4);
}

#[tokio::test]
async fn test_list_exact_scope() {
    let fake = project_with_variables();

    let production = list_variables(&fake.client(), 1, &ScopeFilter::parse("production"))
        .await
        .unwrap();

    let keys: Vec<&str> = production.iter().map(|v| v.key.as_str()).collect();
    assert_eq!(keys, vec!["API_KEY", "SENTRY_DSN"]);
    assert_eq!(production[0].value, "prod-key");
}

#[tokio::test]
async fn test_delete_scope_leaves_same_key_in_other_scopes() {
    let fake = project_with_variables();

    let deleted = delete_variables(&fake.client(), 1, &ScopeFilter::parse("staging"), None)
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(
        keys_and_scopes(&fake),
        vec![
            ("API_KEY".to_string(), "production".to_string()),
            ("LOG_LEVEL".to_string(), "*".to_string()),
            ("SENTRY_DSN".to_string(), "production".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_delete_all_clears_keys_defined_in_several_scopes() {
    let fake = project_with_variables();

    let deleted = delete_variables(&fake.client(), 1, &ScopeFilter::All, None)
        .await
        .unwrap();

    assert_eq!(deleted, 5);
    assert!(fake.variables(1).is_empty());
}

#[tokio::test]
async fn test_delete_stops_at_first_failure() {
    let fake = project_with_variables();
    fake.fail(HttpMethod::Delete, "projects/1/variables/LOG_LEVEL");

    let err = delete_variables(&fake.client(), 1, &ScopeFilter::All, None)
        .await
        .unwrap_err();

    match err {
        FleetError::Step(failure) => assert_eq!(failure.step, Step::DeleteVariable),
        other => panic!("unexpected error: {other:?}"),
    }
    // Both API_KEY entries went before the failure, the rest stayed.
    assert_eq!(
        keys_and_scopes(&fake),
        vec![
            ("LOG_LEVEL".to_string(), "*".to_string()),
            ("DATABASE_URL".to_string(), "staging".to_string()),
            ("SENTRY_DSN".to_string(), "production".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unknown_project_is_fatal() {
    let fake = FakeGitLab::new();

    let err = delete_variables(&fake.client(), 9, &ScopeFilter::All, None)
        .await
        .unwrap_err();

    assert!(matches!(err, FleetError::GitLab(ref e) if e.is_not_found()));
}
