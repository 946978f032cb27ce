//! crates/study_shield_core/src/monitor.rs
//!
//! Background sweep that auto-pauses running sessions whose client has stopped
//! sending heartbeats.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CoreResult;
use crate::ports::{Clock, EntityStore};

/// How often the sweep runs.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// A running session whose last heartbeat is older than this is stale.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub paused: usize,
    pub failed: usize,
}

pub struct InactivityMonitor {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    heartbeat_timeout: Duration,
}

impl InactivityMonitor {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            interval: DEFAULT_SWEEP_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        }
    }

    /// Sets the sweep period. A zero period is not a valid tick rate and
    /// keeps the default instead.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            warn!("Ignoring zero sweep interval; keeping {:?}", self.interval);
        } else {
            self.interval = interval;
        }
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// One pass over the stale sessions. Each session is saved on its own; a
    /// failed save is logged and counted, and the pass carries on.
    pub async fn sweep_once(&self) -> CoreResult<SweepReport> {
        let now = self.clock.now();
        let timeout = chrono::Duration::from_std(self.heartbeat_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        let cutoff = now - timeout;

        let stale = self.store.find_stale_sessions(cutoff).await?;
        let mut report = SweepReport::default();

        for mut session in stale {
            session.auto_pause(now);
            match self.store.save_session(&session).await {
                Ok(()) => {
                    report.paused += 1;
                    warn!(
                        session_id = %session.id,
                        user_id = %session.owner_id,
                        last_heartbeat = %session.last_heartbeat,
                        "Paused session due to inactivity"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!(session_id = %session.id, error = %e, "Failed to auto-pause session");
                }
            }
        }

        if report.paused == 0 && report.failed == 0 {
            debug!("Inactivity sweep: no stale sessions");
        }
        Ok(report)
    }

    /// Runs the sweep on a fixed interval until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.heartbeat_timeout.as_secs(),
            "Inactivity monitor started"
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Inactivity monitor stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "Inactivity sweep failed");
                    }
                }
            }
        }
    }
}
