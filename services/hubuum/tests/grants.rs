mod common;

use axum::http::StatusCode;
use common::{TestApp, read_json};
use hubuum::store::InventoryStore;
use hubuum_authz::{Capability, CapabilitySet};
use http_helpers::{empty_request, json_request};
use serde_json::json;

#[tokio::test]
async fn concurrent_grants_for_one_pair_yield_one_conflict() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    let infra = t.namespace("infra", None).await;
    let netops = t.group("netops").await;

    let uri = "/api/v1/namespaces/infra/groups/netops";
    let (first, second) = tokio::join!(
        t.send(json_request("POST", uri, Some(&admin), json!({ "has_read": true }))),
        t.send(json_request("POST", uri, Some(&admin), json!({ "has_update": true }))),
    );
    let mut statuses = [first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::NO_CONTENT, StatusCode::CONFLICT]);

    let grants = t
        .store
        .namespace_permissions(infra.id)
        .await
        .expect("grants");
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].group, netops.id);
}

#[tokio::test]
async fn grant_without_flags_is_rejected() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    t.namespace("infra", None).await;
    t.group("netops").await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces/infra/groups/netops",
            Some(&admin),
            json!({}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_group_or_namespace_is_not_found() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    t.namespace("infra", None).await;
    t.group("netops").await;

    for uri in [
        "/api/v1/namespaces/infra/groups/ghosts",
        "/api/v1/namespaces/nowhere/groups/netops",
    ] {
        let response = t
            .send(json_request("POST", uri, Some(&admin), json!({ "has_read": true })))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn grants_cannot_be_patched() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    t.namespace("infra", None).await;
    t.group("netops").await;

    let response = t
        .send(json_request(
            "PATCH",
            "/api/v1/namespaces/infra/groups/netops",
            Some(&admin),
            json!({ "has_read": true }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = read_json(response).await;
    assert_eq!(body["code"], "method_not_allowed");
}

#[tokio::test]
async fn revoke_then_revoke_again() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    t.namespace("infra", None).await;
    t.group("netops").await;
    let uri = "/api/v1/namespaces/infra/groups/netops";

    let response = t
        .send(json_request("POST", uri, Some(&admin), json!({ "has_read": true })))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = t.send(empty_request("GET", uri, Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["has_read"], true);
    assert_eq!(body["has_update"], false);

    let response = t.send(empty_request("DELETE", uri, Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = t.send(empty_request("DELETE", uri, Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = t.send(empty_request("GET", uri, Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revoking_a_grant_removes_visibility() {
    let t = TestApp::new();
    let owners = t.group("owners").await;
    let readers = t.group("readers").await;
    t.namespace("infra", Some(owners.id)).await;
    let (_, owner) = t.user("owner", &[&owners]).await;
    let (_, reader) = t.user("reader", &[&readers]).await;
    let uri = "/api/v1/namespaces/infra/groups/readers";

    let response = t
        .send(json_request("POST", uri, Some(&owner), json!({ "has_read": true })))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = t
        .send(empty_request("GET", "/api/v1/namespaces/infra", Some(&reader)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.send(empty_request("DELETE", uri, Some(&owner))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = t
        .send(empty_request("GET", "/api/v1/namespaces/infra", Some(&reader)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn managing_grants_needs_namespace_capability() {
    let t = TestApp::new();
    let editors = t.group("editors").await;
    t.group("others").await;
    let infra = t.namespace("infra", None).await;
    let caps: CapabilitySet = [Capability::Read, Capability::Update, Capability::Delete]
        .into_iter()
        .collect();
    t.store
        .grant(infra.id, editors.id, caps)
        .await
        .expect("grant");
    let (_, editor) = t.user("editor", &[&editors]).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces/infra/groups/others",
            Some(&editor),
            json!({ "has_read": true }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .send(empty_request(
            "GET",
            "/api/v1/namespaces/infra/groups/editors",
            Some(&editor),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn namespace_groups_lists_grant_holders() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    let owners = t.group("owners").await;
    t.group("bystanders").await;
    t.namespace("infra", Some(owners.id)).await;

    let response = t
        .send(empty_request("GET", "/api/v1/namespaces/infra/groups", Some(&admin)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let names: Vec<_> = body["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|group| group["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("owners")]);
}

async fn holder_names(t: &TestApp, uri: &str, token: &str) -> Vec<serde_json::Value> {
    let response = t.send(empty_request("GET", uri, Some(token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    body["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|group| group["name"].clone())
        .collect()
}

#[tokio::test]
async fn namespace_groups_filter_by_capability() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    let owners = t.group("owners").await;
    let readers = t.group("readers").await;
    let infra = t.namespace("infra", Some(owners.id)).await;
    t.store
        .grant(infra.id, readers.id, CapabilitySet::empty().with(Capability::Read))
        .await
        .expect("grant");

    let uri = "/api/v1/namespaces/infra/groups";
    assert_eq!(
        holder_names(&t, uri, &admin).await,
        vec![json!("owners"), json!("readers")]
    );
    let uri = "/api/v1/namespaces/infra/groups?capability=read";
    assert_eq!(
        holder_names(&t, uri, &admin).await,
        vec![json!("owners"), json!("readers")]
    );
    let uri = "/api/v1/namespaces/infra/groups?capability=namespace";
    assert_eq!(holder_names(&t, uri, &admin).await, vec![json!("owners")]);

    let response = t
        .send(empty_request(
            "GET",
            "/api/v1/namespaces/infra/groups?capability=admin",
            Some(&admin),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn permission_collection_is_admin_managed() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    let owners = t.group("owners").await;
    let readers = t.group("readers").await;
    t.namespace("infra", Some(owners.id)).await;
    t.namespace("hidden", None).await;
    let (_, owner) = t.user("owner", &[&owners]).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/permissions",
            Some(&owner),
            json!({ "namespace": "infra", "group": "readers", "has_read": true }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/permissions",
            Some(&admin),
            json!({ "namespace": "infra", "group": readers.id.to_string(), "has_read": true }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    let id = created["id"].as_i64().expect("id");

    let response = t
        .send(empty_request("GET", "/api/v1/permissions", Some(&owner)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["items"].as_array().expect("items").len(), 2);

    let response = t
        .send(empty_request("GET", &format!("/api/v1/permissions/{id}"), Some(&owner)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .send(empty_request("GET", "/api/v1/permissions/not-a-number", Some(&owner)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t
        .send(json_request(
            "PATCH",
            &format!("/api/v1/permissions/{id}"),
            Some(&admin),
            json!({ "has_update": true }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = t
        .send(empty_request("DELETE", &format!("/api/v1/permissions/{id}"), Some(&owner)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = t
        .send(empty_request("DELETE", &format!("/api/v1/permissions/{id}"), Some(&admin)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
