//! crates/study_shield_core/src/memory.rs
//!
//! In-process implementations of the ports: a map-backed [`EntityStore`] and a
//! settable [`Clock`]. Used by the test suites and by the `memory` store backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Challenge, ChallengeType, Milestone, ShopItem, StudySession, User, UserCredentials,
};
use crate::ports::{Clock, EntityStore, PortError, PortResult};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    passwords: HashMap<Uuid, String>,
    tokens: HashMap<String, (Uuid, DateTime<Utc>)>,
    sessions: HashMap<Uuid, StudySession>,
    challenges: Vec<Challenge>,
    milestones: Vec<Milestone>,
    shop_items: Vec<ShopItem>,
}

/// A map-backed entity store. Every call clones in and out, so callers get
/// the same read-modify-write behaviour as with a remote document store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn create_user(&self, user: User, hashed_password: &str) -> PortResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }
        t.passwords.insert(user.id, hashed_password.to_string());
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let t = self.tables.read().await;
        let user = t
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        let hashed_password = t
            .passwords
            .get(&user.id)
            .cloned()
            .ok_or_else(|| PortError::Unexpected("User has no credentials".to_string()))?;
        Ok(UserCredentials {
            user_id: user.id,
            email: user.email.clone(),
            hashed_password,
        })
    }

    async fn save_user(&self, user: &User) -> PortResult<()> {
        let mut t = self.tables.write().await;
        match t.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(PortError::NotFound(format!("User {} not found", user.id))),
        }
    }

    async fn increment_focus_time(&self, user_id: Uuid, minutes: u64) -> PortResult<()> {
        let mut t = self.tables.write().await;
        let user = t
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.total_focus_time = user.total_focus_time.saturating_add(minutes);
        user.weekly_focus_time = user.weekly_focus_time.saturating_add(minutes);
        user.monthly_focus_time = user.monthly_focus_time.saturating_add(minutes);
        Ok(())
    }

    async fn create_auth_token(&self, token: &str, user_id: Uuid, expires_at: DateTime<Utc>) -> PortResult<()> {
        self.tables
            .write()
            .await
            .tokens
            .insert(token.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_token(&self, token: &str, now: DateTime<Utc>) -> PortResult<Uuid> {
        match self.tables.read().await.tokens.get(token) {
            Some((user_id, expires_at)) if *expires_at > now => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_token(&self, token: &str) -> PortResult<()> {
        self.tables.write().await.tokens.remove(token);
        Ok(())
    }

    async fn insert_session(&self, session: &StudySession) -> PortResult<()> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<StudySession> {
        self.tables
            .read()
            .await
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn save_session(&self, session: &StudySession) -> PortResult<()> {
        let mut t = self.tables.write().await;
        match t.sessions.get_mut(&session.id) {
            Some(slot) => {
                *slot = session.clone();
                Ok(())
            }
            None => Err(PortError::NotFound(format!("Session {} not found", session.id))),
        }
    }

    async fn list_sessions_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<StudySession>> {
        let mut sessions: Vec<StudySession> = self
            .tables
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn find_open_session(&self, owner_id: Uuid) -> PortResult<Option<StudySession>> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id && s.end_time.is_none())
            .max_by_key(|s| s.start_time)
            .cloned())
    }

    async fn find_stale_sessions(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<StudySession>> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .filter(|s| !s.is_paused && s.end_time.is_none() && s.last_heartbeat < cutoff)
            .cloned()
            .collect())
    }

    async fn get_challenge(&self, challenge_id: Uuid) -> PortResult<Challenge> {
        self.tables
            .read()
            .await
            .challenges
            .iter()
            .find(|c| c.id == challenge_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Challenge {} not found", challenge_id)))
    }

    async fn list_challenges(&self, kind: Option<ChallengeType>) -> PortResult<Vec<Challenge>> {
        Ok(self
            .tables
            .read()
            .await
            .challenges
            .iter()
            .filter(|c| kind.map_or(true, |k| c.challenge_type == k))
            .cloned()
            .collect())
    }

    async fn insert_challenge(&self, challenge: &Challenge) -> PortResult<()> {
        self.tables.write().await.challenges.push(challenge.clone());
        Ok(())
    }

    async fn get_milestone(&self, milestone_id: Uuid) -> PortResult<Milestone> {
        self.tables
            .read()
            .await
            .milestones
            .iter()
            .find(|m| m.id == milestone_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Milestone {} not found", milestone_id)))
    }

    async fn list_milestones(&self) -> PortResult<Vec<Milestone>> {
        Ok(self.tables.read().await.milestones.clone())
    }

    async fn insert_milestone(&self, milestone: &Milestone) -> PortResult<()> {
        self.tables.write().await.milestones.push(milestone.clone());
        Ok(())
    }

    async fn get_shop_item(&self, item_id: Uuid) -> PortResult<ShopItem> {
        self.tables
            .read()
            .await
            .shop_items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Shop item {} not found", item_id)))
    }

    async fn list_shop_items(&self) -> PortResult<Vec<ShopItem>> {
        Ok(self.tables.read().await.shop_items.clone())
    }

    async fn insert_shop_item(&self, item: &ShopItem) -> PortResult<()> {
        self.tables.write().await.shop_items.push(item.clone());
        Ok(())
    }
}

//=========================================================================================
// Manual Clock
//=========================================================================================

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}
