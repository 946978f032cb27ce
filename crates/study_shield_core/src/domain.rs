//! crates/study_shield_core/src/domain.rs
//!
//! Defines the core data structures for the application: study sessions, the
//! user ledger and the read-only reward catalog.
//!
//! The types derive serde so document stores can persist them as-is; nothing in
//! here knows which store that is.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

//=========================================================================================
// Study Sessions
//=========================================================================================

/// One planned block of work inside a study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Planned duration in minutes.
    pub duration: u32,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            duration,
            completed: false,
        }
    }
}

/// A single timed study activity owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub tasks: Vec<Task>,
    /// Minutes.
    pub planned_duration: u32,
    /// Minutes, set on completion.
    pub actual_duration: Option<u32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_paused: bool,
    pub paused_at: Option<DateTime<Utc>>,
    /// Accumulated pause time in whole seconds.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub total_paused: u64,
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default)]
    pub distractions_blocked: u32,
    pub notes: Option<String>,
}

/// Lifecycle position of a [`StudySession`], derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    Paused,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Closed => "closed",
        }
    }
}

/// Accepts an integer, a float or null for an accumulated-seconds counter and
/// floors it into a non-negative integer.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(match value {
        None => 0,
        Some(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f > 0.0 {
                    f.floor() as u64
                } else {
                    0
                }
            } else {
                0
            }
        }
    })
}

//=========================================================================================
// User Ledger
//=========================================================================================

/// One day's worth of recorded study activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyStat {
    pub date: DateTime<Utc>,
    /// Minutes.
    pub focus_time: u32,
    pub sessions: u32,
    #[serde(default)]
    pub distractions_blocked: u32,
}

/// A user's progress towards one catalog challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub challenge_id: Uuid,
    pub progress: i64,
    pub is_completed: bool,
    /// Set once the completion reward has been credited.
    #[serde(default)]
    pub reward_paid: bool,
    pub last_updated: DateTime<Utc>,
}

/// A user's progress along one milestone's tier ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneProgress {
    pub milestone_id: Uuid,
    pub progress: i64,
    pub current_tier: Option<TierName>,
    pub next_goal: Option<i64>,
    #[serde(default)]
    pub claimed_tiers: BTreeSet<TierName>,
}

/// The root aggregate: identity, balances, streaks and embedded progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub day_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default = "default_multiplier")]
    pub streak_multiplier: f64,
    pub last_active_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub challenges: Vec<ChallengeProgress>,
    #[serde(default)]
    pub milestones: Vec<MilestoneProgress>,
    #[serde(default)]
    pub purchased_items: Vec<Uuid>,
    #[serde(default)]
    pub blocked_websites: Vec<String>,
    #[serde(default)]
    pub total_focus_time: u64,
    #[serde(default)]
    pub weekly_focus_time: u64,
    #[serde(default)]
    pub today_focus_time: u64,
    #[serde(default)]
    pub monthly_focus_time: u64,
    #[serde(default)]
    pub study_stats: Vec<StudyStat>,
    pub current_session: Option<Uuid>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl User {
    /// A freshly registered user with an empty ledger.
    pub fn new(name: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            coins: 0,
            day_streak: 0,
            longest_streak: 0,
            streak_multiplier: 1.0,
            last_active_date: None,
            challenges: Vec::new(),
            milestones: Vec::new(),
            purchased_items: Vec::new(),
            blocked_websites: Vec::new(),
            total_focus_time: 0,
            weekly_focus_time: 0,
            today_focus_time: 0,
            monthly_focus_time: 0,
            study_stats: Vec::new(),
            current_session: None,
            last_login: None,
            created_at: now,
        }
    }
}

// Only used internally for login/register - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents an issued bearer token
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Reward Catalog (read-only inputs to the progression engine)
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    Daily,
    Special,
    Milestone,
}

impl ChallengeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::Daily => "daily",
            ChallengeType::Special => "special",
            ChallengeType::Milestone => "milestone",
        }
    }
}

impl FromStr for ChallengeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(ChallengeType::Daily),
            "special" => Ok(ChallengeType::Special),
            "milestone" => Ok(ChallengeType::Milestone),
            other => Err(format!("unknown challenge type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub coins: i64,
    pub goal: i64,
    pub challenge_type: ChallengeType,
    #[serde(default)]
    pub is_limited: bool,
    /// Seconds.
    pub expires_in: Option<i64>,
}

/// Tier names in ladder order; `Ord` follows the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierName {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl TierName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Bronze => "bronze",
            TierName::Silver => "silver",
            TierName::Gold => "gold",
            TierName::Platinum => "platinum",
        }
    }

    /// The tier that follows this one in the fixed ladder.
    pub fn next(&self) -> Option<TierName> {
        match self {
            TierName::Bronze => Some(TierName::Silver),
            TierName::Silver => Some(TierName::Gold),
            TierName::Gold => Some(TierName::Platinum),
            TierName::Platinum => None,
        }
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(TierName::Bronze),
            "silver" => Ok(TierName::Silver),
            "gold" => Ok(TierName::Gold),
            "platinum" => Ok(TierName::Platinum),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRequirement {
    pub value: i64,
    pub coins: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressUnit {
    Hours,
    Days,
    Blocks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tiers: BTreeMap<TierName, TierRequirement>,
    pub progress_unit: ProgressUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    pub image_url: String,
    pub category: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_json(total_paused: serde_json::Value) -> serde_json::Value {
        json!({
            "id": Uuid::nil(),
            "owner_id": Uuid::nil(),
            "tasks": [],
            "planned_duration": 30,
            "actual_duration": null,
            "start_time": "2024-05-01T10:00:00Z",
            "end_time": null,
            "is_paused": false,
            "paused_at": null,
            "total_paused": total_paused,
            "last_heartbeat": "2024-05-01T10:00:00Z",
            "notes": null
        })
    }

    #[test]
    fn total_paused_accepts_floats_and_null() {
        let s: StudySession = serde_json::from_value(session_json(json!(12.9))).unwrap();
        assert_eq!(s.total_paused, 12);
        let s: StudySession = serde_json::from_value(session_json(json!(null))).unwrap();
        assert_eq!(s.total_paused, 0);
        let s: StudySession = serde_json::from_value(session_json(json!(-4.0))).unwrap();
        assert_eq!(s.total_paused, 0);
        let s: StudySession = serde_json::from_value(session_json(json!(40))).unwrap();
        assert_eq!(s.total_paused, 40);
    }

    #[test]
    fn tier_ladder_order() {
        assert_eq!(TierName::Bronze.next(), Some(TierName::Silver));
        assert_eq!(TierName::Gold.next(), Some(TierName::Platinum));
        assert_eq!(TierName::Platinum.next(), None);
        assert!(TierName::Bronze < TierName::Platinum);
        assert_eq!("gold".parse::<TierName>(), Ok(TierName::Gold));
        assert!("diamond".parse::<TierName>().is_err());
    }

    #[test]
    fn milestone_tiers_serialize_with_lowercase_keys() {
        let mut tiers = BTreeMap::new();
        tiers.insert(TierName::Silver, TierRequirement { value: 50, coins: 150 });
        let m = Milestone {
            id: Uuid::nil(),
            title: "Distraction Defender".into(),
            description: "Block distracting websites".into(),
            tiers,
            progress_unit: ProgressUnit::Blocks,
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["tiers"]["silver"]["value"], 50);
        assert_eq!(v["progress_unit"], "blocks");
    }
}
