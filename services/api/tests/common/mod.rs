#![allow(dead_code)]

use std::sync::Arc;

use api_lib::config::{Config, StoreBackend};
use api_lib::web::{self, AppState};
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use async_trait::async_trait;
use study_shield_core::{
    Challenge, ChallengeType, EntityStore, InMemoryStore, ManualClock, Milestone, PortError,
    PortResult, ShopItem, StudySession, User, UserCredentials,
};
use tower::ServiceExt;
use uuid::Uuid;

/// 2024-05-10 09:00 UTC, a Friday.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap()
}

/// Service settings for router tests: the in-memory backend, otherwise defaults.
pub fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        ..Config::default()
    }
}

/// The full router over an in-memory store, plus handles on the store and
/// clock for arranging state directly.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    /// The router runs over a [`FaultyStore`] wrapping `store`; `store` itself
    /// stays reachable for arranging state.
    pub fn with_faults(faults: Faults) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let faulty = Arc::new(FaultyStore {
            inner: store.clone(),
            faults,
        });
        let state = Arc::new(AppState::new(faulty, clock.clone(), Arc::new(test_config())));
        let router = web::router(state).expect("router should build");
        Self {
            router,
            store,
            clock,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn post(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(Method::POST, uri, Some(token), None).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers `email` and exchanges its password for a token.
    /// Returns `(user_id, token)`.
    pub async fn signed_in(&self, email: &str) -> (String, String) {
        let password = "correct horse battery staple";
        let response = self
            .post_json(
                "/auth/register",
                None,
                serde_json::json!({ "name": "Test Student", "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), 201);
        let user_id = body_json(response).await["user_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = self
            .post_json(
                "/auth/token",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), 200);
        let token = body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string();
        (user_id, token)
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Store failures to inject under the router.
#[derive(Debug, Default, Clone, Copy)]
pub struct Faults {
    /// Token validation fails with an unexpected backend error.
    pub token_store_down: bool,
    /// Email lookups miss, so the duplicate only surfaces at insert time.
    pub hide_existing_emails: bool,
}

/// Delegates to an [`InMemoryStore`] except where [`Faults`] says otherwise.
pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    faults: Faults,
}

#[async_trait]
impl EntityStore for FaultyStore {
    async fn create_user(&self, user: User, hashed_password: &str) -> PortResult<User> {
        self.inner.create_user(user, hashed_password).await
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.inner.get_user(user_id).await
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        if self.faults.hide_existing_emails {
            return Err(PortError::NotFound(format!("No user with email {email}")));
        }
        self.inner.get_credentials_by_email(email).await
    }

    async fn save_user(&self, user: &User) -> PortResult<()> {
        self.inner.save_user(user).await
    }

    async fn increment_focus_time(&self, user_id: Uuid, minutes: u64) -> PortResult<()> {
        self.inner.increment_focus_time(user_id, minutes).await
    }

    async fn create_auth_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.inner.create_auth_token(token, user_id, expires_at).await
    }

    async fn validate_auth_token(&self, token: &str, now: DateTime<Utc>) -> PortResult<Uuid> {
        if self.faults.token_store_down {
            return Err(PortError::Unexpected("connection refused".to_string()));
        }
        self.inner.validate_auth_token(token, now).await
    }

    async fn delete_auth_token(&self, token: &str) -> PortResult<()> {
        self.inner.delete_auth_token(token).await
    }

    async fn insert_session(&self, session: &StudySession) -> PortResult<()> {
        self.inner.insert_session(session).await
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<StudySession> {
        self.inner.get_session(session_id).await
    }

    async fn save_session(&self, session: &StudySession) -> PortResult<()> {
        self.inner.save_session(session).await
    }

    async fn list_sessions_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<StudySession>> {
        self.inner.list_sessions_by_owner(owner_id).await
    }

    async fn find_open_session(&self, owner_id: Uuid) -> PortResult<Option<StudySession>> {
        self.inner.find_open_session(owner_id).await
    }

    async fn find_stale_sessions(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<StudySession>> {
        self.inner.find_stale_sessions(cutoff).await
    }

    async fn get_challenge(&self, challenge_id: Uuid) -> PortResult<Challenge> {
        self.inner.get_challenge(challenge_id).await
    }

    async fn list_challenges(&self, kind: Option<ChallengeType>) -> PortResult<Vec<Challenge>> {
        self.inner.list_challenges(kind).await
    }

    async fn insert_challenge(&self, challenge: &Challenge) -> PortResult<()> {
        self.inner.insert_challenge(challenge).await
    }

    async fn get_milestone(&self, milestone_id: Uuid) -> PortResult<Milestone> {
        self.inner.get_milestone(milestone_id).await
    }

    async fn list_milestones(&self) -> PortResult<Vec<Milestone>> {
        self.inner.list_milestones().await
    }

    async fn insert_milestone(&self, milestone: &Milestone) -> PortResult<()> {
        self.inner.insert_milestone(milestone).await
    }

    async fn get_shop_item(&self, item_id: Uuid) -> PortResult<ShopItem> {
        self.inner.get_shop_item(item_id).await
    }

    async fn list_shop_items(&self) -> PortResult<Vec<ShopItem>> {
        self.inner.list_shop_items().await
    }

    async fn insert_shop_item(&self, item: &ShopItem) -> PortResult<()> {
        self.inner.insert_shop_item(item).await
    }
}
