//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use study_shield_core::{Clock, EntityStore, LedgerService, ProgressionEngine, SessionService};

use crate::config::Config;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
    pub sessions: SessionService,
    pub progression: ProgressionEngine,
    pub ledger: LedgerService,
}

impl AppState {
    /// Wires the core services to one store and one clock.
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>, config: Arc<Config>) -> Self {
        Self {
            sessions: SessionService::new(store.clone(), clock.clone()),
            progression: ProgressionEngine::new(store.clone(), clock.clone()),
            ledger: LedgerService::new(store.clone()),
            store,
            clock,
            config,
        }
    }
}
