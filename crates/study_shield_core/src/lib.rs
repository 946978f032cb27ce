pub mod domain;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod monitor;
pub mod ports;
pub mod progression;
pub mod session;

pub use domain::{
    AuthToken, Challenge, ChallengeProgress, ChallengeType, Milestone, MilestoneProgress,
    ProgressUnit, SessionState, ShopItem, StudySession, StudyStat, Task, TierName,
    TierRequirement, User, UserCredentials,
};
pub use error::{parse_id, CoreError, CoreResult};
pub use ledger::LedgerService;
pub use memory::{InMemoryStore, ManualClock};
pub use monitor::{InactivityMonitor, SweepReport};
pub use ports::{Clock, EntityStore, PortError, PortResult, SystemClock};
pub use progression::ProgressionEngine;
pub use session::{CompleteSession, CompletionSummary, SessionService};
