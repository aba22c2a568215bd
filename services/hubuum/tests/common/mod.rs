#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use chrono::Utc;
use hubuum::app::{AppState, build_router};
use hubuum::auth::token;
use hubuum::model::{AuthToken, Group, Namespace, NewUser, User};
use hubuum::store::memory::InMemoryStore;
use hubuum::store::{IdentityStore, InventoryStore};
use hubuum_authz::GroupId;
use std::sync::Arc;
use tower::ServiceExt;

pub type App = axum::routing::RouterIntoService<Body, ()>;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Router over an in-memory store, with direct store access for fixtures.
pub struct TestApp {
    pub app: App,
    pub store: InMemoryStore,
}

impl TestApp {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let state = AppState::new(Arc::new(store.clone()), chrono::Duration::hours(1));
        Self {
            app: build_router(state).into_service(),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.app.clone().oneshot(request).await.expect("response")
    }

    pub async fn group(&self, name: &str) -> Group {
        self.store.create_group(name).await.expect("group")
    }

    /// Create a user in `groups` and return it with a live token secret.
    pub async fn user(&self, username: &str, groups: &[&Group]) -> (User, String) {
        self.user_with(
            NewUser {
                username: username.to_string(),
                email: format!("{username}@example.org"),
                ..NewUser::default()
            },
            groups,
        )
        .await
    }

    pub async fn admin(&self, username: &str) -> (User, String) {
        self.user_with(
            NewUser {
                username: username.to_string(),
                is_superuser: true,
                ..NewUser::default()
            },
            &[],
        )
        .await
    }

    async fn user_with(&self, new_user: NewUser, groups: &[&Group]) -> (User, String) {
        let user = self.store.create_user(new_user).await.expect("user");
        for group in groups {
            self.store
                .add_member(group.id, user.id)
                .await
                .expect("membership");
        }
        let secret = token::generate_secret();
        let now = Utc::now();
        self.store
            .insert_token(AuthToken {
                digest: token::digest(&secret),
                user_id: user.id,
                created_at: now,
                expires_at: now + chrono::Duration::hours(1),
            })
            .await
            .expect("token");
        let user = self.store.get_user(user.id).await.expect("reload");
        (user, secret)
    }

    pub async fn namespace(&self, name: &str, owner: Option<GroupId>) -> Namespace {
        self.store
            .create_namespace(
                hubuum::model::NewNamespace {
                    name: hubuum_authz::NamespaceName::parse(name).expect("name"),
                    description: String::new(),
                },
                owner,
            )
            .await
            .expect("namespace")
    }
}
