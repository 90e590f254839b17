//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use badminton_club_web::{
    ManualClock, MemoryStore, PlayerDefaults, PlayerId, RotationStrategy, ServiceSettings,
    SessionService, SessionState, Skill,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub type TestService = SessionService<Arc<MemoryStore>, Arc<ManualClock>>;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap()
}

pub struct Fixture {
    pub service: TestService,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

pub fn fixture(strategy: RotationStrategy) -> Fixture {
    let store = Arc::new(MemoryStore::new(SessionState::new(4, "123456")));
    let clock = Arc::new(ManualClock::new(start_time()));
    let settings = ServiceSettings {
        strategy,
        ..ServiceSettings::default()
    };
    let service = SessionService::connect(store.clone(), clock.clone(), settings).unwrap();
    Fixture {
        service,
        store,
        clock,
    }
}

impl Fixture {
    /// Check in one player with the given skill; returns their id.
    pub fn check_in(&self, name: &str, skill: Skill) -> PlayerId {
        let defaults = PlayerDefaults {
            skill,
            ..PlayerDefaults::default()
        };
        let (player, _) = self.service.check_in(name, defaults).unwrap();
        self.assert_invariants();
        player.id
    }

    /// Check in `names` in order, all intermediate.
    pub fn check_in_all(&self, names: &[&str]) -> Vec<PlayerId> {
        names
            .iter()
            .map(|n| self.check_in(n, Skill::Intermediate))
            .collect()
    }

    pub fn state(&self) -> SessionState {
        self.service.state().unwrap()
    }

    pub fn assert_invariants(&self) {
        if let Err(violation) = self.state().check_invariants() {
            panic!("invariant violated: {}", violation);
        }
    }

    pub fn name_of(&self, id: PlayerId) -> String {
        self.state().player(id).unwrap().name.clone()
    }
}
