//! crates/study_shield_core/src/progression.rs
//!
//! Streaks, focus-time rollups, challenge payouts, milestone tiers and shop
//! purchases.
//!
//! The rules are pure functions over a [`User`] and `now`. [`ProgressionEngine`]
//! loads, applies and saves them against the entity store.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    Challenge, ChallengeProgress, ChallengeType, Milestone, MilestoneProgress, ShopItem, StudyStat,
    TierName, User,
};
use crate::error::{CoreError, CoreResult};
use crate::ledger::{ensure_self, load_user};
use crate::ports::{Clock, EntityStore, PortError};

const WEEK_DAYS: i64 = 7;
const MONTH_DAYS: i64 = 30;

//=========================================================================================
// Streaks
//=========================================================================================

/// Consecutive calendar days with a stat record, counted backwards from `today`.
/// Zero when `today` itself has no record.
pub fn compute_day_streak(stats: &[StudyStat], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = stats.iter().map(|s| s.date.date_naive()).collect();
    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

pub fn streak_multiplier(day_streak: u32) -> f64 {
    match day_streak {
        s if s >= 30 => 3.0,
        s if s >= 14 => 2.0,
        s if s >= 7 => 1.5,
        _ => 1.0,
    }
}

/// Reward multiplier for daily challenges: one extra step per full week of
/// streak, capped at two.
pub fn daily_streak_bonus(day_streak: u32) -> i64 {
    1 + i64::from(day_streak / 7).min(2)
}

pub fn challenge_reward(challenge: &Challenge, day_streak: u32) -> i64 {
    match challenge.challenge_type {
        ChallengeType::Daily => challenge.coins.saturating_mul(daily_streak_bonus(day_streak)),
        _ => challenge.coins,
    }
}

//=========================================================================================
// Focus-Time Accounting
//=========================================================================================

/// Read-time derivation of streak and rollups from `study_stats`. Overwrites the
/// incrementally maintained weekly and monthly counters.
pub fn recompute_on_profile_read(user: &mut User, now: DateTime<Utc>) {
    let today = now.date_naive();
    user.day_streak = compute_day_streak(&user.study_stats, today);
    user.longest_streak = user.longest_streak.max(user.day_streak);
    user.streak_multiplier = streak_multiplier(user.day_streak);

    let week_start = now - Duration::days(WEEK_DAYS);
    let month_start = now - Duration::days(MONTH_DAYS);
    let sum_since = |from: Option<DateTime<Utc>>| -> u64 {
        user.study_stats
            .iter()
            .filter(|s| match from {
                Some(from) => s.date >= from,
                None => s.date.date_naive() == today,
            })
            .map(|s| u64::from(s.focus_time))
            .sum()
    };
    let today_total = sum_since(None);
    let weekly = sum_since(Some(week_start));
    let monthly = sum_since(Some(month_start));

    user.today_focus_time = today_total;
    user.weekly_focus_time = weekly;
    user.monthly_focus_time = monthly;
}

/// The stat record a completed session contributes. Always a new record, even
/// when one already exists for the same day.
pub fn completion_stat(actual_duration: u32, distractions_blocked: u32, now: DateTime<Utc>) -> StudyStat {
    StudyStat {
        date: now,
        focus_time: actual_duration,
        sessions: 1,
        distractions_blocked,
    }
}

/// Manual focus-time entry: bumps the counters, walks the streak forward against
/// `last_active_date` and merges into today's stat record.
pub fn apply_focus_time_update(user: &mut User, minutes: u32, now: DateTime<Utc>) {
    let minutes_u64 = u64::from(minutes);
    user.total_focus_time = user.total_focus_time.saturating_add(minutes_u64);
    user.weekly_focus_time = user.weekly_focus_time.saturating_add(minutes_u64);
    user.monthly_focus_time = user.monthly_focus_time.saturating_add(minutes_u64);

    let today = now.date_naive();
    let last_active = user.last_active_date.map(|d| d.date_naive());
    match last_active {
        Some(day) if day == today => {}
        Some(day) if Some(day) == today.pred_opt() => {
            user.day_streak = user.day_streak.saturating_add(1);
            user.longest_streak = user.longest_streak.max(user.day_streak);
        }
        _ => user.day_streak = 1,
    }
    user.last_active_date = Some(now);

    user.merge_today_stat(minutes, now);
}

//=========================================================================================
// Challenges
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeOutcome {
    pub progress: ChallengeProgress,
    pub coins_awarded: i64,
}

/// Adds `delta` to the user's progress on `challenge`.
///
/// The reward is credited only when the record is complete *and* its progress
/// equals `delta`, i.e. the whole goal was reached by this one update.
pub fn apply_challenge_progress(
    user: &mut User,
    challenge: &Challenge,
    delta: i64,
    now: DateTime<Utc>,
) -> ChallengeOutcome {
    let day_streak = user.day_streak;
    let record = user.challenge_progress_mut(challenge.id, now);
    record.progress = record.progress.saturating_add(delta);
    record.is_completed = record.progress >= challenge.goal;
    record.last_updated = now;

    let mut coins_awarded = 0;
    if record.is_completed && record.progress == delta {
        coins_awarded = challenge_reward(challenge, day_streak);
        record.reward_paid = true;
    }
    let progress = record.clone();
    user.credit(coins_awarded);

    ChallengeOutcome {
        progress,
        coins_awarded,
    }
}

//=========================================================================================
// Milestones
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub tier: TierName,
    pub coins_awarded: i64,
    pub next_goal: Option<i64>,
}

/// Adds `delta` to the user's progress on `milestone`. The first update points
/// `next_goal` at the lowest tier; payout only happens through a claim.
pub fn apply_milestone_progress(user: &mut User, milestone: &Milestone, delta: i64) -> MilestoneProgress {
    let first_goal = milestone.tiers.values().next().map(|t| t.value);
    let record = user.milestone_progress_mut(milestone.id);
    record.progress = record.progress.saturating_add(delta);
    if record.next_goal.is_none() && record.claimed_tiers.is_empty() {
        record.next_goal = first_goal;
    }
    record.clone()
}

pub fn claim_milestone_tier(user: &mut User, milestone: &Milestone, tier_name: &str) -> CoreResult<ClaimOutcome> {
    let progress = user
        .milestone_progress(milestone.id)
        .map(|m| m.progress)
        .ok_or_else(|| CoreError::InvalidState("Milestone not started by user".to_string()))?;

    let tier: TierName = tier_name
        .parse()
        .map_err(|_| CoreError::NotFound("Tier not found".to_string()))?;
    let requirement = milestone
        .tiers
        .get(&tier)
        .copied()
        .ok_or_else(|| CoreError::NotFound("Tier not found".to_string()))?;

    if progress < requirement.value {
        return Err(CoreError::InvalidState("Tier requirements not met".to_string()));
    }

    let next_goal = tier
        .next()
        .and_then(|next| milestone.tiers.get(&next))
        .map(|t| t.value);

    let record = user.milestone_progress_mut(milestone.id);
    if record.claimed_tiers.contains(&tier) {
        return Err(CoreError::InvalidState("Tier already claimed".to_string()));
    }
    record.claimed_tiers.insert(tier);
    record.current_tier = Some(tier);
    record.next_goal = next_goal;
    user.credit(requirement.coins);

    Ok(ClaimOutcome {
        tier,
        coins_awarded: requirement.coins,
        next_goal,
    })
}

//=========================================================================================
// Shop
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub item_id: Uuid,
    pub price: i64,
    pub balance: i64,
}

/// Debits the item's price and records ownership. Owning the same item twice is allowed.
pub fn purchase_item(user: &mut User, item: &ShopItem) -> CoreResult<PurchaseReceipt> {
    user.debit(item.price)?;
    user.purchased_items.push(item.id);
    Ok(PurchaseReceipt {
        item_id: item.id,
        price: item.price,
        balance: user.coins,
    })
}

//=========================================================================================
// Progression Engine
//=========================================================================================

#[derive(Clone)]
pub struct ProgressionEngine {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
}

impl ProgressionEngine {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Folds a completed session into the ledger: atomically bumps the rollup
    /// counters in the store, then appends the day's stat to a fresh copy of
    /// the user. The returned user is not yet saved.
    pub async fn apply_completion(
        &self,
        user_id: Uuid,
        actual_duration: u32,
        distractions_blocked: u32,
    ) -> CoreResult<User> {
        self.store
            .increment_focus_time(user_id, u64::from(actual_duration))
            .await?;
        let mut user = load_user(self.store.as_ref(), user_id).await?;
        user.append_stat(completion_stat(actual_duration, distractions_blocked, self.clock.now()));
        Ok(user)
    }

    /// The caller's own profile with streak and rollups recomputed and persisted.
    pub async fn profile(&self, caller: Uuid) -> CoreResult<User> {
        let mut user = load_user(self.store.as_ref(), caller).await?;
        recompute_on_profile_read(&mut user, self.clock.now());
        self.store.save_user(&user).await?;
        Ok(user)
    }

    pub async fn update_focus_time(&self, caller: Uuid, user_id: Uuid, minutes: u32) -> CoreResult<User> {
        ensure_self(caller, user_id)?;
        let mut user = load_user(self.store.as_ref(), user_id).await?;
        apply_focus_time_update(&mut user, minutes, self.clock.now());
        self.store.save_user(&user).await?;
        info!(user_id = %user_id, minutes, day_streak = user.day_streak, "Focus time recorded");
        Ok(user)
    }

    pub async fn update_challenge_progress(
        &self,
        caller: Uuid,
        user_id: Uuid,
        challenge_id: Uuid,
        delta: i64,
    ) -> CoreResult<ChallengeOutcome> {
        ensure_self(caller, user_id)?;
        let mut user = load_user(self.store.as_ref(), user_id).await?;
        let challenge = self
            .store
            .get_challenge(challenge_id)
            .await
            .map_err(not_found("Challenge not found"))?;

        let outcome = apply_challenge_progress(&mut user, &challenge, delta, self.clock.now());
        self.store.save_user(&user).await?;
        if outcome.coins_awarded > 0 {
            info!(user_id = %user_id, challenge_id = %challenge_id, coins = outcome.coins_awarded, "Challenge reward paid");
        }
        Ok(outcome)
    }

    pub async fn update_milestone_progress(
        &self,
        caller: Uuid,
        user_id: Uuid,
        milestone_id: Uuid,
        delta: i64,
    ) -> CoreResult<MilestoneProgress> {
        ensure_self(caller, user_id)?;
        let mut user = load_user(self.store.as_ref(), user_id).await?;
        let milestone = self
            .store
            .get_milestone(milestone_id)
            .await
            .map_err(not_found("Milestone not found"))?;

        let progress = apply_milestone_progress(&mut user, &milestone, delta);
        self.store.save_user(&user).await?;
        Ok(progress)
    }

    pub async fn claim_milestone_tier(
        &self,
        caller: Uuid,
        user_id: Uuid,
        milestone_id: Uuid,
        tier_name: &str,
    ) -> CoreResult<ClaimOutcome> {
        ensure_self(caller, user_id)?;
        let mut user = load_user(self.store.as_ref(), user_id).await?;
        let milestone = self
            .store
            .get_milestone(milestone_id)
            .await
            .map_err(not_found("Milestone not found"))?;

        let outcome = claim_milestone_tier(&mut user, &milestone, tier_name)?;
        self.store.save_user(&user).await?;
        info!(user_id = %user_id, milestone_id = %milestone_id, tier = %outcome.tier, coins = outcome.coins_awarded, "Milestone tier claimed");
        Ok(outcome)
    }

    pub async fn purchase_item(&self, caller: Uuid, user_id: Uuid, item_id: Uuid) -> CoreResult<PurchaseReceipt> {
        ensure_self(caller, user_id)?;
        let mut user = load_user(self.store.as_ref(), user_id).await?;
        let item = self
            .store
            .get_shop_item(item_id)
            .await
            .map_err(not_found("Item not found"))?;

        let receipt = purchase_item(&mut user, &item)?;
        self.store.save_user(&user).await?;
        info!(user_id = %user_id, item_id = %item_id, price = item.price, "Shop item purchased");
        Ok(receipt)
    }
}

fn not_found(message: &'static str) -> impl Fn(PortError) -> CoreError {
    move |e| match e {
        PortError::NotFound(_) => CoreError::NotFound(message.to_string()),
        other => other.into(),
    }
}
