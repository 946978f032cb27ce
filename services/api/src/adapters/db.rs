//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `EntityStore` port from the `core` crate. Entities are stored as JSONB
//! documents in PostgreSQL, with the fields used in predicates mirrored into
//! plain columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use study_shield_core::domain::{
    Challenge, ChallengeType, Milestone, ShopItem, StudySession, User, UserCredentials,
};
use study_shield_core::ports::{EntityStore, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `EntityStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `EntityStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl EntityStore for DbAdapter {
    async fn create_user(&self, user: User, hashed_password: &str) -> PortResult<User> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, doc, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(hashed_password)
        .bind(Json(&user))
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                PortError::Conflict("Email already registered".to_string())
            } else {
                unexpected(e)
            }
        })?;
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|Json(user)| user)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let row: Option<(Uuid, String, String)> = sqlx::query_as(
            "SELECT id, email, password_hash FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        let (user_id, email, hashed_password) =
            row.ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(UserCredentials {
            user_id,
            email,
            hashed_password,
        })
    }

    async fn save_user(&self, user: &User) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET doc = $2, email = $3 WHERE id = $1")
            .bind(user.id)
            .bind(Json(user))
            .bind(&user.email)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user.id)));
        }
        Ok(())
    }

    async fn increment_focus_time(&self, user_id: Uuid, minutes: u64) -> PortResult<()> {
        let minutes = i64::try_from(minutes)
            .map_err(|_| PortError::Unexpected("focus time increment overflows".to_string()))?;
        let result = sqlx::query(
            r#"UPDATE users SET doc = doc || jsonb_build_object(
                   'total_focus_time',   COALESCE((doc->>'total_focus_time')::bigint, 0) + $2,
                   'weekly_focus_time',  COALESCE((doc->>'weekly_focus_time')::bigint, 0) + $2,
                   'monthly_focus_time', COALESCE((doc->>'monthly_focus_time')::bigint, 0) + $2)
               WHERE id = $1"#,
        )
        .bind(user_id)
        .bind(minutes)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn create_auth_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_token(&self, token: &str, now: DateTime<Utc>) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_tokens WHERE token = $1 AND expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_token(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn insert_session(&self, session: &StudySession) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO study_sessions (id, owner_id, start_time, end_time, is_paused, last_heartbeat, doc) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(session.id)
        .bind(session.owner_id)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.is_paused)
        .bind(session.last_heartbeat)
        .bind(Json(session))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<StudySession> {
        sqlx::query_scalar::<_, Json<StudySession>>("SELECT doc FROM study_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|Json(session)| session)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn save_session(&self, session: &StudySession) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE study_sessions SET end_time = $2, is_paused = $3, last_heartbeat = $4, doc = $5 \
             WHERE id = $1",
        )
        .bind(session.id)
        .bind(session.end_time)
        .bind(session.is_paused)
        .bind(session.last_heartbeat)
        .bind(Json(session))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Session {} not found", session.id)));
        }
        Ok(())
    }

    async fn list_sessions_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<StudySession>> {
        let docs = sqlx::query_scalar::<_, Json<StudySession>>(
            "SELECT doc FROM study_sessions WHERE owner_id = $1 ORDER BY start_time DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(docs.into_iter().map(|Json(s)| s).collect())
    }

    async fn find_open_session(&self, owner_id: Uuid) -> PortResult<Option<StudySession>> {
        let doc = sqlx::query_scalar::<_, Json<StudySession>>(
            "SELECT doc FROM study_sessions WHERE owner_id = $1 AND end_time IS NULL \
             ORDER BY start_time DESC LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(doc.map(|Json(s)| s))
    }

    async fn find_stale_sessions(&self, cutoff: DateTime<Utc>) -> PortResult<Vec<StudySession>> {
        let docs = sqlx::query_scalar::<_, Json<StudySession>>(
            "SELECT doc FROM study_sessions \
             WHERE is_paused = FALSE AND end_time IS NULL AND last_heartbeat < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(docs.into_iter().map(|Json(s)| s).collect())
    }

    async fn get_challenge(&self, challenge_id: Uuid) -> PortResult<Challenge> {
        sqlx::query_scalar::<_, Json<Challenge>>("SELECT doc FROM challenges WHERE id = $1")
            .bind(challenge_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|Json(c)| c)
            .ok_or_else(|| PortError::NotFound(format!("Challenge {} not found", challenge_id)))
    }

    async fn list_challenges(&self, kind: Option<ChallengeType>) -> PortResult<Vec<Challenge>> {
        let docs = sqlx::query_scalar::<_, Json<Challenge>>(
            "SELECT doc FROM challenges WHERE $1::text IS NULL OR challenge_type = $1",
        )
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(docs.into_iter().map(|Json(c)| c).collect())
    }

    async fn insert_challenge(&self, challenge: &Challenge) -> PortResult<()> {
        sqlx::query("INSERT INTO challenges (id, challenge_type, doc) VALUES ($1, $2, $3)")
            .bind(challenge.id)
            .bind(challenge.challenge_type.as_str())
            .bind(Json(challenge))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_milestone(&self, milestone_id: Uuid) -> PortResult<Milestone> {
        sqlx::query_scalar::<_, Json<Milestone>>("SELECT doc FROM milestones WHERE id = $1")
            .bind(milestone_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|Json(m)| m)
            .ok_or_else(|| PortError::NotFound(format!("Milestone {} not found", milestone_id)))
    }

    async fn list_milestones(&self) -> PortResult<Vec<Milestone>> {
        let docs = sqlx::query_scalar::<_, Json<Milestone>>("SELECT doc FROM milestones")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(docs.into_iter().map(|Json(m)| m).collect())
    }

    async fn insert_milestone(&self, milestone: &Milestone) -> PortResult<()> {
        sqlx::query("INSERT INTO milestones (id, doc) VALUES ($1, $2)")
            .bind(milestone.id)
            .bind(Json(milestone))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_shop_item(&self, item_id: Uuid) -> PortResult<ShopItem> {
        sqlx::query_scalar::<_, Json<ShopItem>>("SELECT doc FROM shop_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|Json(i)| i)
            .ok_or_else(|| PortError::NotFound(format!("Shop item {} not found", item_id)))
    }

    async fn list_shop_items(&self) -> PortResult<Vec<ShopItem>> {
        let docs = sqlx::query_scalar::<_, Json<ShopItem>>("SELECT doc FROM shop_items")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(docs.into_iter().map(|Json(i)| i).collect())
    }

    async fn insert_shop_item(&self, item: &ShopItem) -> PortResult<()> {
        sqlx::query("INSERT INTO shop_items (id, doc) VALUES ($1, $2)")
            .bind(item.id)
            .bind(Json(item))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
