//! crates/study_shield_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document store and of the wall clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Challenge, ChallengeType, Milestone, ShopItem, StudySession, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable mapping from entity id to document.
///
/// Saves are full-document replaces with last-write-wins semantics; there is no
/// version check. `increment_focus_time` is the one store-level atomic update.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: User, hashed_password: &str) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn save_user(&self, user: &User) -> PortResult<()>;

    /// Adds `minutes` to the total, weekly and monthly focus-time counters in a
    /// single atomic update.
    async fn increment_focus_time(&self, user_id: Uuid, minutes: u64) -> PortResult<()>;

    // --- Auth Tokens ---
    async fn create_auth_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live token to its user id; expired or unknown tokens are `Unauthorized`.
    async fn validate_auth_token(&self, token: &str, now: DateTime<Utc>) -> PortResult<Uuid>;

    async fn delete_auth_token(&self, token: &str) -> PortResult<()>;

    // --- Study Sessions ---
    async fn insert_session(&self, session: &StudySession) -> PortResult<()>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<StudySession>;

    async fn save_session(&self, session: &StudySession) -> PortResult<()>;

    /// All sessions owned by `owner_id`, newest start first.
    async fn list_sessions_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<StudySession>>;

    /// Any session of `owner_id` that has not ended.
    async fn find_open_session(&self, owner_id: Uuid) -> PortResult<Option<StudySession>>;

    /// Sessions that are running (not paused, not ended) with a heartbeat older than `cutoff`.
    async fn find_stale_sessions(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<StudySession>>;

    // --- Catalog ---
    async fn get_challenge(&self, challenge_id: Uuid) -> PortResult<Challenge>;

    async fn list_challenges(&self, kind: Option<ChallengeType>) -> PortResult<Vec<Challenge>>;

    async fn insert_challenge(&self, challenge: &Challenge) -> PortResult<()>;

    async fn get_milestone(&self, milestone_id: Uuid) -> PortResult<Milestone>;

    async fn list_milestones(&self) -> PortResult<Vec<Milestone>>;

    async fn insert_milestone(&self, milestone: &Milestone) -> PortResult<()>;

    async fn get_shop_item(&self, item_id: Uuid) -> PortResult<ShopItem>;

    async fn list_shop_items(&self) -> PortResult<Vec<ShopItem>>;

    async fn insert_shop_item(&self, item: &ShopItem) -> PortResult<()>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
