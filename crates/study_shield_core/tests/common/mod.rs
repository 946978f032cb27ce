//! Shared fixtures for the core integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use study_shield_core::{EntityStore, InMemoryStore, ManualClock, User};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap()
}

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            clock: Arc::new(ManualClock::new(t0())),
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use study_shield_core::Clock;
        self.clock.now()
    }

    pub async fn user(&self, email: &str) -> User {
        self.store
            .create_user(User::new("Test User", email, t0()), "not-a-real-hash")
            .await
            .expect("user creation should succeed")
    }
}
