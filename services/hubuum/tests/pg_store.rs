#![cfg(feature = "pg-tests")]

use hubuum::config::PostgresConfig;
use hubuum::model::{NewNamespace, NewResource, NewUser, ResourcePatch};
use hubuum::store::postgres::PostgresStore;
use hubuum::store::{HubuumStore, IdentityStore, InventoryStore, StoreError};
use hubuum_authz::{Capability, CapabilitySet, GroupId, LookupField, NamespaceName, ResourceKind};
use serde_json::json;
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;

async fn reset_postgres(url: &str) -> Result<(), sqlx::Error> {
    let pool = match tokio::time::timeout(
        std::time::Duration::from_secs(2),
        PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect(url),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => return Err(sqlx::Error::PoolTimedOut),
    };
    sqlx::migrate!("./migrations").run(&pool).await?;
    sqlx::query(
        "TRUNCATE auth_tokens, resources, permissions, group_members, users, groups, namespaces RESTART IDENTITY",
    )
    .execute(&pool)
    .await
    .map(|_| ())
}

async fn pg_store() -> Option<PostgresStore> {
    let url = match std::env::var("HUBUUM_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping pg-tests: set HUBUUM_TEST_DATABASE_URL or DATABASE_URL");
            return None;
        }
    };
    if let Err(err) = reset_postgres(&url).await {
        eprintln!("skipping pg-tests: cannot connect to postgres: {err}");
        return None;
    }
    let config = PostgresConfig {
        url,
        max_connections: 5,
        connect_timeout_ms: 5_000,
        acquire_timeout_ms: 5_000,
    };
    Some(
        PostgresStore::connect_without_migrations(&config)
            .await
            .expect("connect"),
    )
}

fn name(value: &str) -> NamespaceName {
    NamespaceName::parse(value).expect("name")
}

#[tokio::test]
#[serial]
async fn namespace_creation_grants_the_owner_everything() {
    let Some(store) = pg_store().await else {
        return;
    };
    store.health_check().await.expect("health");
    let netops = store.create_group("netops").await.expect("group");
    let infra = store
        .create_namespace(
            NewNamespace {
                name: name("infra"),
                description: "core".to_string(),
            },
            Some(netops.id),
        )
        .await
        .expect("namespace");
    let grant = store
        .find_permission(infra.id, netops.id)
        .await
        .expect("lookup")
        .expect("grant");
    assert_eq!(grant.capabilities(), CapabilitySet::all());

    let err = store
        .create_namespace(
            NewNamespace {
                name: name("infra"),
                description: String::new(),
            },
            None,
        )
        .await
        .expect_err("duplicate");
    assert!(matches!(err, StoreError::Conflict(_)));

    let err = store
        .create_namespace(
            NewNamespace {
                name: name("orphan"),
                description: String::new(),
            },
            Some(GroupId::new(9999)),
        )
        .await
        .expect_err("unknown owner");
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(
        store
            .namespace_by_name("orphan")
            .await
            .expect("lookup")
            .is_none()
    );

    let readers = store.create_group("readers").await.expect("group");
    store
        .grant(infra.id, readers.id, CapabilitySet::empty().with(Capability::Read))
        .await
        .expect("grant");
    let upgraded = store.grant_all(infra.id, readers.id).await.expect("grant all");
    assert_eq!(upgraded.capabilities(), CapabilitySet::all());
}

#[tokio::test]
#[serial]
async fn second_grant_for_a_pair_conflicts() {
    let Some(store) = pg_store().await else {
        return;
    };
    let netops = store.create_group("netops").await.expect("group");
    let infra = store
        .create_namespace(
            NewNamespace {
                name: name("infra"),
                description: String::new(),
            },
            None,
        )
        .await
        .expect("namespace");
    let read: CapabilitySet = [Capability::Read].into_iter().collect();
    store.grant(infra.id, netops.id, read).await.expect("grant");
    let err = store
        .grant(infra.id, netops.id, read)
        .await
        .expect_err("second grant");
    assert!(matches!(err, StoreError::Conflict(_)));

    let holders = store
        .groups_with_capability(infra.id, Capability::Read)
        .await
        .expect("holders");
    assert_eq!(holders.len(), 1);
    assert!(store.revoke(infra.id, netops.id).await.expect("revoke"));
    assert!(!store.revoke(infra.id, netops.id).await.expect("revoke"));
}

#[tokio::test]
#[serial]
async fn namespace_delete_cascades() {
    let Some(store) = pg_store().await else {
        return;
    };
    let netops = store.create_group("netops").await.expect("group");
    let infra = store
        .create_namespace(
            NewNamespace {
                name: name("infra"),
                description: String::new(),
            },
            Some(netops.id),
        )
        .await
        .expect("namespace");
    for host in ["web01", "web02"] {
        store
            .create_resource(NewResource {
                kind: ResourceKind::Host,
                namespace: infra.id,
                name: host.to_string(),
                attributes: serde_json::Map::new(),
            })
            .await
            .expect("host");
    }
    store.delete_namespace(infra.id).await.expect("delete");
    assert!(store.list_resources(ResourceKind::Host).await.expect("hosts").is_empty());
    assert!(store.list_permissions().await.expect("permissions").is_empty());
    assert!(store.namespace_by_name("infra").await.expect("lookup").is_none());
}

#[tokio::test]
#[serial]
async fn hosts_are_found_by_fqdn_and_patched_by_merge() {
    let Some(store) = pg_store().await else {
        return;
    };
    let infra = store
        .create_namespace(
            NewNamespace {
                name: name("infra"),
                description: String::new(),
            },
            None,
        )
        .await
        .expect("namespace");
    let attributes = json!({ "fqdn": "web01.example.org", "rack": "r1" });
    let host = store
        .create_resource(NewResource {
            kind: ResourceKind::Host,
            namespace: infra.id,
            name: "web01".to_string(),
            attributes: attributes.as_object().cloned().expect("object"),
        })
        .await
        .expect("host");
    let found = store
        .find_resources(ResourceKind::Host, LookupField::Fqdn, "web01.example.org")
        .await
        .expect("lookup");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, host.id);

    let patch = json!({ "rack": "r2" });
    let updated = store
        .update_resource(
            host.id,
            ResourcePatch {
                namespace: None,
                name: None,
                attributes: patch.as_object().cloned(),
                replace_attributes: false,
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.attributes["rack"], "r2");
    assert_eq!(updated.fqdn(), Some("web01.example.org"));
}

#[tokio::test]
#[serial]
async fn users_carry_their_groups_and_tokens_die_with_them() {
    let Some(store) = pg_store().await else {
        return;
    };
    let g1 = store.create_group("g1").await.expect("group");
    let g2 = store.create_group("g2").await.expect("group");
    let alice = store
        .create_user(NewUser {
            username: "alice".to_string(),
            email: "alice@example.org".to_string(),
            ..NewUser::default()
        })
        .await
        .expect("user");
    assert!(store.add_member(g1.id, alice.id).await.expect("add"));
    assert!(!store.add_member(g1.id, alice.id).await.expect("add again"));
    store.add_member(g2.id, alice.id).await.expect("add");
    let reloaded = store.get_user(alice.id).await.expect("user");
    assert_eq!(reloaded.groups, vec![g1.id, g2.id]);

    let by_email = store
        .find_users(LookupField::Email, "alice@example.org")
        .await
        .expect("lookup");
    assert_eq!(by_email.len(), 1);

    let now = chrono::Utc::now();
    store
        .insert_token(hubuum::model::AuthToken {
            digest: "abc".to_string(),
            user_id: alice.id,
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
        })
        .await
        .expect("token");
    assert!(store.token("abc", now).await.expect("token").is_some());
    store.delete_user(alice.id).await.expect("delete");
    assert!(store.token("abc", now).await.expect("token").is_none());
}
