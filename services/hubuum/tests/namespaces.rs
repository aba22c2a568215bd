mod common;

use axum::http::StatusCode;
use common::{TestApp, read_json};
use hubuum::store::InventoryStore;
use hubuum_authz::ResourceKind;
use http_helpers::{empty_request, json_request};
use serde_json::json;

#[tokio::test]
async fn admin_creates_root_and_groupless_user_cannot() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    let (_, nobody) = t.user("nobody", &[]).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&admin),
            json!({ "name": "infra" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["name"], "infra");

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&nobody),
            json!({ "name": "other" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn anonymous_requests_are_unauthenticated() {
    let t = TestApp::new();
    let response = t
        .send(empty_request("GET", "/api/v1/namespaces", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = t
        .send(empty_request("GET", "/api/v1/namespaces", Some("not-a-token")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn root_namespace_is_denied_even_with_grants_elsewhere() {
    let t = TestApp::new();
    let netops = t.group("netops").await;
    t.namespace("infra", Some(netops.id)).await;
    let (_, token) = t.user("alice", &[&netops]).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&token),
            json!({ "name": "toplevel" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn child_creation_needs_namespace_capability_on_parent() {
    let t = TestApp::new();
    let owners = t.group("owners").await;
    let readers = t.group("readers").await;
    let infra = t.namespace("infra", Some(owners.id)).await;
    t.store
        .grant(
            infra.id,
            readers.id,
            [hubuum_authz::Capability::Read].into_iter().collect(),
        )
        .await
        .expect("grant");
    let (_, owner) = t.user("owner", &[&owners]).await;
    let (_, reader) = t.user("reader", &[&readers]).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&reader),
            json!({ "name": "infra.dc1" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&owner),
            json!({ "name": "infra.dc1", "description": "first dc" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    assert_eq!(created["description"], "first dc");

    // The single-group creator's group owns the child outright.
    let child = t
        .store
        .namespace_by_name("infra.dc1")
        .await
        .expect("lookup")
        .expect("child");
    let grant = t
        .store
        .find_permission(child.id, owners.id)
        .await
        .expect("lookup")
        .expect("owner grant");
    assert!(grant.has_create && grant.has_read && grant.has_update);
    assert!(grant.has_delete && grant.has_namespace);
}

#[tokio::test]
async fn child_of_missing_parent_is_not_found() {
    let t = TestApp::new();
    let netops = t.group("netops").await;
    let (_, token) = t.user("alice", &[&netops]).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&token),
            json!({ "name": "ghost.child" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_names_are_rejected() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    for name in ["", "a..b", ".a", "a."] {
        let response = t
            .send(json_request(
                "POST",
                "/api/v1/namespaces",
                Some(&admin),
                json!({ "name": name }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "name {name:?}");
    }
}

#[tokio::test]
async fn multi_group_user_must_name_the_owner_group() {
    let t = TestApp::new();
    let g1 = t.group("g1").await;
    let g2 = t.group("g2").await;
    t.namespace("infra", Some(g1.id)).await;
    let (_, token) = t.user("alice", &[&g1, &g2]).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&token),
            json!({ "name": "infra.sub" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], "validation_error");
    assert!(
        t.store
            .namespace_by_name("infra.sub")
            .await
            .expect("lookup")
            .is_none()
    );

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&token),
            json!({ "name": "infra.sub", "group": "g1" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn owner_group_must_be_one_of_the_callers_groups() {
    let t = TestApp::new();
    let g1 = t.group("g1").await;
    let outsiders = t.group("outsiders").await;
    t.namespace("infra", Some(g1.id)).await;
    let (_, token) = t.user("alice", &[&g1]).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&token),
            json!({ "name": "infra.sub", "group": outsiders.id.to_string() }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rename_needs_namespace_not_update() {
    let t = TestApp::new();
    let owners = t.group("owners").await;
    let editors = t.group("editors").await;
    let infra = t.namespace("infra", Some(owners.id)).await;
    t.namespace("taken", None).await;
    t.store
        .grant(
            infra.id,
            editors.id,
            [
                hubuum_authz::Capability::Read,
                hubuum_authz::Capability::Update,
            ]
            .into_iter()
            .collect(),
        )
        .await
        .expect("grant");
    let (_, owner) = t.user("owner", &[&owners]).await;
    let (_, editor) = t.user("editor", &[&editors]).await;

    let response = t
        .send(json_request(
            "PATCH",
            "/api/v1/namespaces/infra",
            Some(&editor),
            json!({ "name": "infrastructure" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .send(json_request(
            "PATCH",
            "/api/v1/namespaces/infra",
            Some(&owner),
            json!({ "name": "taken" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = t
        .send(json_request(
            "PATCH",
            &format!("/api/v1/namespaces/{}", infra.id),
            Some(&owner),
            json!({ "name": "infrastructure" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["name"], "infrastructure");
}

#[tokio::test]
async fn namespace_lookup_accepts_id_and_name() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    let infra = t.namespace("infra", None).await;

    for key in [infra.id.to_string(), "infra".to_string()] {
        let response = t
            .send(empty_request(
                "GET",
                &format!("/api/v1/namespaces/{key}"),
                Some(&admin),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["id"], infra.id.get());
    }

    let response = t
        .send(empty_request("GET", "/api/v1/namespaces/nowhere", Some(&admin)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_is_filtered_to_readable_namespaces() {
    let t = TestApp::new();
    let netops = t.group("netops").await;
    t.namespace("infra", Some(netops.id)).await;
    t.namespace("secret", None).await;
    let (_, member) = t.user("alice", &[&netops]).await;
    let (_, stranger) = t.user("bob", &[]).await;
    let (_, admin) = t.admin("root").await;

    let names = |body: serde_json::Value| -> Vec<String> {
        body["items"]
            .as_array()
            .expect("items")
            .iter()
            .map(|item| item["name"].as_str().expect("name").to_string())
            .collect()
    };

    let response = t
        .send(empty_request("GET", "/api/v1/namespaces", Some(&member)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(names(read_json(response).await), vec!["infra"]);

    let response = t
        .send(empty_request("GET", "/api/v1/namespaces", Some(&stranger)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(names(read_json(response).await).is_empty());

    let response = t
        .send(empty_request("GET", "/api/v1/namespaces", Some(&admin)))
        .await;
    assert_eq!(names(read_json(response).await), vec!["infra", "secret"]);
}

#[tokio::test]
async fn delete_cascades_to_grants_and_resources() {
    let t = TestApp::new();
    let (_, admin) = t.admin("root").await;
    let netops = t.group("netops").await;
    let infra = t.namespace("infra", None).await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces/infra/groups/netops",
            Some(&admin),
            json!({ "has_read": true }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    for host in ["web01", "web02"] {
        let response = t
            .send(json_request(
                "POST",
                "/api/v1/hosts",
                Some(&admin),
                json!({ "namespace": "infra", "name": host }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = t
        .send(empty_request("DELETE", "/api/v1/namespaces/infra", Some(&admin)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let hosts = t
        .store
        .list_resources(ResourceKind::Host)
        .await
        .expect("hosts");
    assert!(hosts.iter().all(|host| host.namespace != infra.id));
    assert!(hosts.is_empty());
    let grants = t.store.list_permissions().await.expect("permissions");
    assert!(grants.iter().all(|grant| grant.namespace != infra.id));
    assert!(
        t.store
            .find_permission(infra.id, netops.id)
            .await
            .expect("lookup")
            .is_none()
    );

    let response = t
        .send(empty_request("GET", "/api/v1/namespaces/infra", Some(&admin)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_needs_namespace_capability() {
    let t = TestApp::new();
    let deleters = t.group("deleters").await;
    let infra = t.namespace("infra", None).await;
    t.store
        .grant(
            infra.id,
            deleters.id,
            [
                hubuum_authz::Capability::Read,
                hubuum_authz::Capability::Delete,
            ]
            .into_iter()
            .collect(),
        )
        .await
        .expect("grant");
    let (_, token) = t.user("alice", &[&deleters]).await;

    let response = t
        .send(empty_request("DELETE", "/api/v1/namespaces/infra", Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn rename_to_a_new_parent_is_checked_like_creation() {
    let t = TestApp::new();
    let owners = t.group("owners").await;
    let others = t.group("others").await;
    t.namespace("infra", None).await;
    t.namespace("lab", Some(others.id)).await;
    t.namespace("mine", Some(owners.id)).await;
    let sub = t
        .store
        .create_namespace(
            hubuum::model::NewNamespace {
                name: hubuum_authz::NamespaceName::parse("infra.sub").expect("name"),
                description: String::new(),
            },
            Some(owners.id),
        )
        .await
        .expect("namespace");
    let (_, owner) = t.user("owner", &[&owners]).await;
    let (_, admin) = t.admin("root").await;

    let response = t
        .send(json_request(
            "POST",
            "/api/v1/namespaces",
            Some(&owner),
            json!({ "name": "evil" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let cases = [
        ("evil", StatusCode::FORBIDDEN),
        ("lab.sub", StatusCode::FORBIDDEN),
        ("ghost.sub", StatusCode::NOT_FOUND),
    ];
    for (name, status) in cases {
        let response = t
            .send(json_request(
                "PATCH",
                "/api/v1/namespaces/infra.sub",
                Some(&owner),
                json!({ "name": name }),
            ))
            .await;
        assert_eq!(response.status(), status, "{name}");
    }
    assert!(
        t.store
            .namespace_by_name("infra.sub")
            .await
            .expect("lookup")
            .is_some()
    );

    // Same parent: only the namespace grant on the namespace itself matters.
    let response = t
        .send(json_request(
            "PATCH",
            "/api/v1/namespaces/infra.sub",
            Some(&owner),
            json!({ "name": "infra.renamed" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A parent where the caller holds the namespace capability is fine.
    let response = t
        .send(json_request(
            "PATCH",
            &format!("/api/v1/namespaces/{}", sub.id),
            Some(&owner),
            json!({ "name": "mine.sub" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .send(json_request(
            "PATCH",
            "/api/v1/namespaces/mine.sub",
            Some(&admin),
            json!({ "name": "toplevel" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn put_replaces_a_namespace_and_needs_namespace_capability() {
    let t = TestApp::new();
    let owners = t.group("owners").await;
    let editors = t.group("editors").await;
    let infra = t.namespace("infra", Some(owners.id)).await;
    t.store
        .grant(
            infra.id,
            editors.id,
            [
                hubuum_authz::Capability::Read,
                hubuum_authz::Capability::Update,
            ]
            .into_iter()
            .collect(),
        )
        .await
        .expect("grant");
    let (_, owner) = t.user("owner", &[&owners]).await;
    let (_, editor) = t.user("editor", &[&editors]).await;
    let body = json!({ "name": "infra", "description": "core network" });

    let response = t
        .send(json_request(
            "PUT",
            "/api/v1/namespaces/infra",
            Some(&editor),
            body.clone(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = t
        .send(json_request("PUT", "/api/v1/namespaces/infra", Some(&owner), body))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["description"], "core network");

    let response = t
        .send(json_request(
            "PUT",
            "/api/v1/namespaces/infra",
            Some(&owner),
            json!({ "description": "no name" }),
        ))
        .await;
    assert!(response.status().is_client_error());
}
