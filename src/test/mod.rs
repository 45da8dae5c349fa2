//! HTTP integration tests for the project API, driven over in-memory
//! collaborator fakes through the real router.

use crate::api::models::projects::ProjectResponse;
use crate::events::ProjectEvent;
use crate::project::deletable::Deletability;
use crate::project::summary::ProjectSummary;
use crate::quota::{QuotaEngine, ResourceKind, ResourceList, PROJECT_REFERENCE};
use crate::test_utils::*;
use axum::http::{Method, StatusCode};
use axum_test::TestServer;
use serde_json::json;

fn server_with(config: crate::Config) -> (TestServer, TestHarness) {
    let harness = create_test_harness(config);
    let server = create_test_server(harness.state.clone());
    (server, harness)
}

fn server() -> (TestServer, TestHarness) {
    server_with(create_test_config())
}

async fn create_project(server: &TestServer, name: &str) -> axum_test::TestResponse {
    admin_headers(server.post("/api/projects"), "admin").json(&json!({ "name": name })).await
}

#[test_log::test(tokio::test)]
async fn create_project_returns_location_and_fires_event() {
    let (server, harness) = server();

    let response = create_project(&server, "library").await;
    response.assert_status(StatusCode::CREATED);
    let location = response.headers().get("location").expect("Location header");
    assert_eq!(location, "/api/projects/1");

    let events = harness.events.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ProjectEvent::Created { project_id, project, operator } => {
            assert_eq!(*project_id, 1);
            assert_eq!(project, "library");
            assert_eq!(operator, "admin");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // The quota reference is created alongside, unlimited by default
    let hard = harness.quota.hard_limit_of(1).expect("quota reference");
    assert_eq!(hard[&ResourceKind::Storage], -1);
}

#[test_log::test(tokio::test)]
async fn create_project_defaults_to_private() {
    let (server, _harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);

    let response = admin_headers(server.get("/api/projects/1"), "admin").await;
    response.assert_status_ok();
    let project: ProjectResponse = response.json();
    assert_eq!(project.metadata.get("public").map(String::as_str), Some("false"));
}

#[test_log::test(tokio::test)]
async fn create_project_rejects_illegal_names() {
    let (server, _harness) = server();

    for name in ["UPPERCASE", "-leading-dash", "trailing-", "a..b", "white space", ""] {
        let response = admin_headers(server.post("/api/projects"), "admin").json(&json!({ "name": name })).await;
        response.assert_status_bad_request();
    }

    let long_name = "a".repeat(256);
    admin_headers(server.post("/api/projects"), "admin")
        .json(&json!({ "name": long_name }))
        .await
        .assert_status_bad_request();
}

#[test_log::test(tokio::test)]
async fn create_project_rejects_duplicate_name() {
    let (server, _harness) = server();

    create_project(&server, "test-proj").await.assert_status(StatusCode::CREATED);
    create_project(&server, "test-proj").await.assert_status(StatusCode::CONFLICT);
}

#[test_log::test(tokio::test)]
async fn create_project_requires_authentication() {
    let (server, _harness) = server();
    server.post("/api/projects").json(&json!({ "name": "library" })).await.assert_status_unauthorized();
}

#[test_log::test(tokio::test)]
async fn admin_only_creation_rejects_ordinary_users() {
    let mut config = create_test_config();
    config.project.only_admin_creation = true;
    let (server, harness) = server_with(config);

    user_headers(server.post("/api/projects"), "kate")
        .json(&json!({ "name": "kates-project" }))
        .await
        .assert_status_forbidden();

    create_project(&server, "admins-project").await.assert_status(StatusCode::CREATED);

    // The solution identity also passes; the platform admin becomes owner
    solution_headers(server.post("/api/projects"))
        .json(&json!({ "name": "provisioned" }))
        .await
        .assert_status(StatusCode::CREATED);
    let record = harness.registry.find_by_name("provisioned").expect("created");
    assert_eq!(record.owner_name, "admin");
}

#[test_log::test(tokio::test)]
async fn storage_limit_is_overridden_for_ordinary_users() {
    let mut config = create_test_config();
    config.project.storage_per_project = 10_240;
    let (server, harness) = server_with(config);

    user_headers(server.post("/api/projects"), "kate")
        .json(&json!({ "name": "kates-project", "storage_limit": 999_999 }))
        .await
        .assert_status(StatusCode::CREATED);
    let hard = harness.quota.hard_limit_of(1).expect("quota reference");
    assert_eq!(hard[&ResourceKind::Storage], 10_240);

    // Administrators may pick their own limit
    admin_headers(server.post("/api/projects"), "admin")
        .json(&json!({ "name": "admins-project", "storage_limit": 999_999 }))
        .await
        .assert_status(StatusCode::CREATED);
    let hard = harness.quota.hard_limit_of(2).expect("quota reference");
    assert_eq!(hard[&ResourceKind::Storage], 999_999);
}

#[test_log::test(tokio::test)]
async fn storage_limit_is_overridden_for_the_solution_identity() {
    let mut config = create_test_config();
    config.project.storage_per_project = 10_240;
    let (server, harness) = server_with(config);

    // The solution identity is trusted but not an administrator; its
    // requested limit is replaced by the platform default too
    solution_headers(server.post("/api/projects"))
        .json(&json!({ "name": "provisioned", "storage_limit": 999_999 }))
        .await
        .assert_status(StatusCode::CREATED);
    let hard = harness.quota.hard_limit_of(1).expect("quota reference");
    assert_eq!(hard[&ResourceKind::Storage], 10_240);
}

#[test_log::test(tokio::test)]
async fn head_probes_existence_by_name() {
    let (server, _harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);

    user_headers(server.method(Method::HEAD, "/api/projects"), "kate")
        .add_query_param("project_name", "library")
        .await
        .assert_status_ok();
    user_headers(server.method(Method::HEAD, "/api/projects"), "kate")
        .add_query_param("project_name", "missing")
        .await
        .assert_status_not_found();
    user_headers(server.method(Method::HEAD, "/api/projects"), "kate").await.assert_status_bad_request();
    server
        .method(Method::HEAD, "/api/projects")
        .add_query_param("project_name", "library")
        .await
        .assert_status_unauthorized();
}

#[test_log::test(tokio::test)]
async fn get_project_reports_membership_roles() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.registry.add_member(1, "kate", 30);
    harness.registry.add_member(1, "kate", 20);
    harness.registry.set_repo_count(1, 7);

    let response = user_headers(server.get("/api/projects/1"), "kate").await;
    response.assert_status_ok();
    let project: ProjectResponse = response.json();
    assert_eq!(project.name, "library");
    assert_eq!(project.current_user_role_id, 30);
    assert_eq!(project.current_user_role_ids, vec![30, 20]);
    assert_eq!(project.repo_count, 7);
    assert_eq!(project.chart_count, None);
}

#[test_log::test(tokio::test)]
async fn get_project_normalizes_legacy_severity() {
    let (server, _harness) = server();
    admin_headers(server.post("/api/projects"), "admin")
        .json(&json!({ "name": "library", "metadata": { "severity": "Critical" } }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = admin_headers(server.get("/api/projects/1"), "admin").await;
    response.assert_status_ok();
    let project: ProjectResponse = response.json();
    assert_eq!(project.metadata.get("severity").map(String::as_str), Some("critical"));
}

#[test_log::test(tokio::test)]
async fn anonymous_may_read_public_projects_only() {
    let (server, _harness) = server();
    admin_headers(server.post("/api/projects"), "admin")
        .json(&json!({ "name": "open", "public": true }))
        .await
        .assert_status(StatusCode::CREATED);
    create_project(&server, "closed").await.assert_status(StatusCode::CREATED);

    server.get("/api/projects/1").await.assert_status_ok();
    server.get("/api/projects/2").await.assert_status_unauthorized();
}

#[test_log::test(tokio::test)]
async fn get_project_validates_id_and_resolves_before_policy() {
    let (server, _harness) = server();

    server.get("/api/projects/0").await.assert_status_bad_request();
    // A missing project is 404 even for an anonymous caller
    server.get("/api/projects/42").await.assert_status_not_found();
}

#[test_log::test(tokio::test)]
async fn update_replaces_metadata() {
    let (server, _harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);

    admin_headers(server.put("/api/projects/1"), "admin")
        .json(&json!({ "metadata": { "public": "true", "auto_scan": "true" } }))
        .await
        .assert_status_ok();

    let response = admin_headers(server.get("/api/projects/1"), "admin").await;
    let project: ProjectResponse = response.json();
    assert_eq!(project.metadata.get("auto_scan").map(String::as_str), Some("true"));
    assert_eq!(project.metadata.get("public").map(String::as_str), Some("true"));

    admin_headers(server.put("/api/projects/1"), "admin")
        .json(&json!({ "metadata": { "auto_scan": "maybe" } }))
        .await
        .assert_status_bad_request();
}

#[test_log::test(tokio::test)]
async fn update_without_public_keeps_visibility() {
    let (server, _harness) = server();
    admin_headers(server.post("/api/projects"), "admin")
        .json(&json!({ "name": "open", "public": true }))
        .await
        .assert_status(StatusCode::CREATED);

    // An update that never mentions the public key must not flip it
    admin_headers(server.put("/api/projects/1"), "admin")
        .json(&json!({ "metadata": { "auto_scan": "true" } }))
        .await
        .assert_status_ok();

    let response = admin_headers(server.get("/api/projects/1"), "admin").await;
    let project: ProjectResponse = response.json();
    assert_eq!(project.metadata.get("public").map(String::as_str), Some("true"));
    assert_eq!(project.metadata.get("auto_scan").map(String::as_str), Some("true"));
    server.get("/api/projects/1").await.assert_status_ok();
}

#[test_log::test(tokio::test)]
async fn update_requires_permission_on_the_project() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.registry.add_member(1, "guest", 20);

    user_headers(server.put("/api/projects/1"), "guest")
        .json(&json!({ "metadata": { "auto_scan": "true" } }))
        .await
        .assert_status_forbidden();

    harness.registry.add_member(1, "maintainer", 40);
    user_headers(server.put("/api/projects/1"), "maintainer")
        .json(&json!({ "metadata": { "auto_scan": "true" } }))
        .await
        .assert_status_ok();
}

#[test_log::test(tokio::test)]
async fn delete_is_blocked_while_repositories_remain() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.registry.set_repo_count(1, 3);

    let response = admin_headers(server.delete("/api/projects/1"), "admin").await;
    response.assert_status(StatusCode::PRECONDITION_FAILED);
    assert!(response.text().contains("repositories"));

    // Nothing was deleted and no Deleted event fired
    admin_headers(server.get("/api/projects/1"), "admin").await.assert_status_ok();
    assert!(matches!(harness.events.events().as_slice(), [ProjectEvent::Created { .. }]));
}

#[test_log::test(tokio::test)]
async fn delete_is_blocked_by_charts_when_chart_service_is_configured() {
    let mut config = create_test_config();
    config.project.with_chart_service = true;
    let (server, harness) = server_with(config);
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.registry.set_chart_count("library", 2);

    let response = admin_headers(server.delete("/api/projects/1"), "admin").await;
    response.assert_status(StatusCode::PRECONDITION_FAILED);
    assert!(response.text().contains("helm charts"));
}

#[test_log::test(tokio::test)]
async fn delete_removes_project_quota_and_fires_event() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);

    admin_headers(server.delete("/api/projects/1"), "admin").await.assert_status_ok();
    admin_headers(server.get("/api/projects/1"), "admin").await.assert_status_not_found();
    assert!(harness.quota.hard_limit_of(1).is_none());

    let events = harness.events.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], ProjectEvent::Deleted { project_id: 1, .. }));
}

#[test_log::test(tokio::test)]
async fn delete_fails_when_quota_release_fails() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.quota.fail_delete.store(true, std::sync::atomic::Ordering::SeqCst);

    admin_headers(server.delete("/api/projects/1"), "admin")
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[test_log::test(tokio::test)]
async fn delete_releases_quota_created_under_earlier_configuration() {
    let mut config = create_test_config();
    config.project.quota_per_project_enabled = false;
    let (server, harness) = server_with(config);
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);

    // A quota reference left over from when per-project quotas were enabled
    let mut hard = ResourceList::new();
    hard.insert(ResourceKind::Storage, 10_240);
    harness.quota.create(PROJECT_REFERENCE, 1, hard).await.unwrap();

    admin_headers(server.delete("/api/projects/1"), "admin").await.assert_status_ok();
    assert!(harness.quota.hard_limit_of(1).is_none());
}

#[test_log::test(tokio::test)]
async fn deletable_reports_the_verdict_without_deleting() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.registry.set_repo_count(1, 1);

    let response = admin_headers(server.get("/api/projects/1/_deletable"), "admin").await;
    response.assert_status_ok();
    let verdict: Deletability = response.json();
    assert!(!verdict.deletable);
    assert!(verdict.message.contains("repositories"));

    admin_headers(server.get("/api/projects/1"), "admin").await.assert_status_ok();
}

#[test_log::test(tokio::test)]
async fn list_respects_anonymous_access_flag() {
    let mut config = create_test_config();
    config.auth.anonymous_access_enabled = false;
    let (server, _harness) = server_with(config);

    server.get("/api/projects").await.assert_status_unauthorized();
}

#[test_log::test(tokio::test)]
async fn anonymous_list_shows_public_projects_only() {
    let (server, _harness) = server();
    admin_headers(server.post("/api/projects"), "admin")
        .json(&json!({ "name": "open", "public": true }))
        .await
        .assert_status(StatusCode::CREATED);
    create_project(&server, "closed").await.assert_status(StatusCode::CREATED);

    let response = server.get("/api/projects").await;
    response.assert_status_ok();
    assert_eq!(response.headers().get("x-total-count").unwrap(), "1");
    let projects: Vec<ProjectResponse> = response.json();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "open");
}

#[test_log::test(tokio::test)]
async fn user_list_is_the_union_of_public_and_memberships() {
    let (server, harness) = server();
    admin_headers(server.post("/api/projects"), "admin")
        .json(&json!({ "name": "open", "public": true }))
        .await
        .assert_status(StatusCode::CREATED);
    create_project(&server, "kates").await.assert_status(StatusCode::CREATED);
    create_project(&server, "closed").await.assert_status(StatusCode::CREATED);
    harness.registry.add_member(2, "kate", 50);
    // Membership in a public project must not produce a duplicate row
    harness.registry.add_member(1, "kate", 20);

    let response = user_headers(server.get("/api/projects"), "kate").await;
    response.assert_status_ok();
    assert_eq!(response.headers().get("x-total-count").unwrap(), "2");
    let mut names: Vec<String> = response.json::<Vec<ProjectResponse>>().into_iter().map(|p| p.name).collect();
    names.sort();
    assert_eq!(names, vec!["kates", "open"]);
}

#[test_log::test(tokio::test)]
async fn robot_list_ignores_memberships() {
    let (server, harness) = server();
    admin_headers(server.post("/api/projects"), "admin")
        .json(&json!({ "name": "open", "public": true }))
        .await
        .assert_status(StatusCode::CREATED);
    create_project(&server, "closed").await.assert_status(StatusCode::CREATED);
    harness.registry.add_member(2, "ci-robot", 30);

    let response = robot_headers(server.get("/api/projects"), "ci-robot").await;
    response.assert_status_ok();
    let projects: Vec<ProjectResponse> = response.json();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "open");
}

#[test_log::test(tokio::test)]
async fn list_is_paginated_without_duplicates() {
    let (server, _harness) = server();
    for i in 1..=5 {
        admin_headers(server.post("/api/projects"), "admin")
            .json(&json!({ "name": format!("proj-{i}"), "public": true }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let mut seen = Vec::new();
    for page in 1..=3 {
        let response = server
            .get("/api/projects")
            .add_query_param("page", page)
            .add_query_param("size", 2)
            .await;
        response.assert_status_ok();
        assert_eq!(response.headers().get("x-total-count").unwrap(), "5");
        let projects: Vec<ProjectResponse> = response.json();
        seen.extend(projects.into_iter().map(|p| p.project_id));
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

#[test_log::test(tokio::test)]
async fn list_filters_by_name_and_owner() {
    let (server, _harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    create_project(&server, "library-staging").await.assert_status(StatusCode::CREATED);
    create_project(&server, "tools").await.assert_status(StatusCode::CREATED);

    let response = admin_headers(server.get("/api/projects"), "admin").add_query_param("name", "library").await;
    let projects: Vec<ProjectResponse> = response.json();
    assert_eq!(projects.len(), 2);

    let response = admin_headers(server.get("/api/projects"), "admin").add_query_param("owner", "nobody").await;
    let projects: Vec<ProjectResponse> = response.json();
    assert!(projects.is_empty());
}

#[test_log::test(tokio::test)]
async fn summary_for_admin_carries_all_facts() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.registry.set_repo_count(1, 4);
    harness.registry.add_member(1, "alice", 50);
    harness.registry.add_member(1, "bob", 30);
    harness.registry.add_member(1, "carol", 30);

    let response = admin_headers(server.get("/api/projects/1/summary"), "admin").await;
    response.assert_status_ok();
    let summary: ProjectSummary = response.json();
    assert_eq!(summary.repo_count, 4);
    assert_eq!(summary.project_admin_count, 1);
    assert_eq!(summary.developer_count, 2);
    assert_eq!(summary.master_count, 0);
    let quota = summary.quota.expect("quota fact");
    assert_eq!(quota.hard[&ResourceKind::Storage], -1);
}

#[test_log::test(tokio::test)]
async fn summary_facts_are_filtered_by_permission() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.registry.add_member(1, "alice", 50);
    // A limited guest may read the project but neither its quota nor its members
    harness.registry.add_member(1, "viewer", 10);

    let response = user_headers(server.get("/api/projects/1/summary"), "viewer").await;
    response.assert_status_ok();
    let summary: ProjectSummary = response.json();
    assert!(summary.quota.is_none());
    assert_eq!(summary.project_admin_count, 0);

    // A developer may list members but still not read the quota
    harness.registry.add_member(1, "dev", 30);
    let response = user_headers(server.get("/api/projects/1/summary"), "dev").await;
    response.assert_status_ok();
    let summary: ProjectSummary = response.json();
    assert!(summary.quota.is_none());
    assert_eq!(summary.project_admin_count, 1);
}

#[test_log::test(tokio::test)]
async fn summary_degrades_when_artifact_counts_fail() {
    let (server, harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);
    harness.registry.add_member(1, "alice", 50);
    harness.registry.fail_artifact_counts.store(true, std::sync::atomic::Ordering::SeqCst);

    // An unavailable artifact catalog degrades the counts to zero
    let response = admin_headers(server.get("/api/projects/1/summary"), "admin").await;
    response.assert_status_ok();
    let summary: ProjectSummary = response.json();
    assert_eq!(summary.repo_count, 0);
    assert_eq!(summary.project_admin_count, 1);
}

#[test_log::test(tokio::test)]
async fn summary_requires_read_permission() {
    let (server, _harness) = server();
    create_project(&server, "library").await.assert_status(StatusCode::CREATED);

    user_headers(server.get("/api/projects/1/summary"), "stranger").await.assert_status_forbidden();
}
