//! crates/study_shield_core/src/ledger.rs
//!
//! Invariant-keeping helpers on the [`User`] ledger, plus the small service
//! behind the user-owned reads and the blocked-website list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ChallengeProgress, MilestoneProgress, StudyStat, User};
use crate::error::{CoreError, CoreResult};
use crate::ports::{EntityStore, PortError};

/// Fails with `Forbidden` unless the caller is acting on their own ledger.
pub fn ensure_self(caller: Uuid, user_id: Uuid) -> CoreResult<()> {
    if caller == user_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Can only act on your own account".to_string(),
        ))
    }
}

impl User {
    pub fn credit(&mut self, coins: i64) {
        self.coins = self.coins.saturating_add(coins);
    }

    /// Debits `price`, refusing to take the balance below zero.
    pub fn debit(&mut self, price: i64) -> CoreResult<()> {
        if self.coins < price {
            return Err(CoreError::InsufficientFunds {
                balance: self.coins,
                price,
            });
        }
        self.coins -= price;
        Ok(())
    }

    /// Appends a new per-day record without looking for an existing one.
    pub fn append_stat(&mut self, stat: StudyStat) {
        self.study_stats.push(stat);
    }

    /// Adds to the record dated on `now`'s calendar day, or appends one.
    pub fn merge_today_stat(&mut self, minutes: u32, now: DateTime<Utc>) {
        let today = now.date_naive();
        match self
            .study_stats
            .iter_mut()
            .find(|s| s.date.date_naive() == today)
        {
            Some(stat) => {
                stat.focus_time = stat.focus_time.saturating_add(minutes);
                stat.sessions = stat.sessions.saturating_add(1);
            }
            None => self.study_stats.push(StudyStat {
                date: now,
                focus_time: minutes,
                sessions: 1,
                distractions_blocked: 0,
            }),
        }
    }

    /// The user's progress record for `challenge_id`, created at zero if missing.
    pub fn challenge_progress_mut(
        &mut self,
        challenge_id: Uuid,
        now: DateTime<Utc>,
    ) -> &mut ChallengeProgress {
        let idx = match self
            .challenges
            .iter()
            .position(|c| c.challenge_id == challenge_id)
        {
            Some(idx) => idx,
            None => {
                self.challenges.push(ChallengeProgress {
                    challenge_id,
                    progress: 0,
                    is_completed: false,
                    reward_paid: false,
                    last_updated: now,
                });
                self.challenges.len() - 1
            }
        };
        &mut self.challenges[idx]
    }

    pub fn milestone_progress(&self, milestone_id: Uuid) -> Option<&MilestoneProgress> {
        self.milestones.iter().find(|m| m.milestone_id == milestone_id)
    }

    /// The user's progress record for `milestone_id`, created at zero if missing.
    pub fn milestone_progress_mut(&mut self, milestone_id: Uuid) -> &mut MilestoneProgress {
        let idx = match self
            .milestones
            .iter()
            .position(|m| m.milestone_id == milestone_id)
        {
            Some(idx) => idx,
            None => {
                self.milestones.push(MilestoneProgress {
                    milestone_id,
                    progress: 0,
                    current_tier: None,
                    next_goal: None,
                    claimed_tiers: Default::default(),
                });
                self.milestones.len() - 1
            }
        };
        &mut self.milestones[idx]
    }

    pub fn block_website(&mut self, website: &str) -> CoreResult<()> {
        let host = normalize_host(website)?;
        if self.blocked_websites.iter().any(|w| *w == host) {
            return Err(CoreError::InvalidState("Website already blocked".to_string()));
        }
        self.blocked_websites.push(host);
        Ok(())
    }

    pub fn unblock_website(&mut self, website: &str) -> CoreResult<()> {
        let host = normalize_host(website)?;
        let before = self.blocked_websites.len();
        self.blocked_websites.retain(|w| *w != host);
        if self.blocked_websites.len() == before {
            return Err(CoreError::NotFound("Website not in blocked list".to_string()));
        }
        Ok(())
    }
}

fn normalize_host(website: &str) -> CoreResult<String> {
    let host = website.trim().to_ascii_lowercase();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(CoreError::InvalidInput("Invalid website".to_string()));
    }
    Ok(host)
}

//=========================================================================================
// Ledger Service
//=========================================================================================

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn EntityStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Loads `user_id` after checking the caller owns it.
    pub async fn load_own(&self, caller: Uuid, user_id: Uuid) -> CoreResult<User> {
        ensure_self(caller, user_id)?;
        load_user(self.store.as_ref(), user_id).await
    }

    pub async fn block_website(&self, caller: Uuid, user_id: Uuid, website: &str) -> CoreResult<Vec<String>> {
        let mut user = self.load_own(caller, user_id).await?;
        user.block_website(website)?;
        self.store.save_user(&user).await?;
        Ok(user.blocked_websites)
    }

    pub async fn unblock_website(&self, caller: Uuid, user_id: Uuid, website: &str) -> CoreResult<Vec<String>> {
        let mut user = self.load_own(caller, user_id).await?;
        user.unblock_website(website)?;
        self.store.save_user(&user).await?;
        Ok(user.blocked_websites)
    }
}

pub(crate) async fn load_user(store: &dyn EntityStore, user_id: Uuid) -> CoreResult<User> {
    store.get_user(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => CoreError::NotFound("User not found".to_string()),
        other => other.into(),
    })
}
