//! Shared test utilities for API handler and service tests.
//!
//! Provides a manually-advanced clock and a `TestStateBuilder` for
//! constructing `AppState` instances with only the mocks needed for each
//! test.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::TestStateBuilder;
//!
//! let mut store = MockRedemptionStore::new();
//! store.expect_try_redeem().returning(|_, _, _| Ok(RedeemOutcome::Redeemed));
//!
//! let state = TestStateBuilder::new().with_store(store).build();
//! ```

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::config::Config;
use crate::services::RedemptionService;
use crate::state::AppState;
use crate::stores::{MockRedemptionStore, RedemptionStore};

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        redis_url: None,
        token_ttl_secs: 300,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// Clock that only moves when a test tells it to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now = *now + Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses a default (empty) mock store, a frozen clock, and the default TTL
/// unless told otherwise, so tests only configure what they actually need.
pub struct TestStateBuilder {
    store: Option<MockRedemptionStore>,
    clock: Option<Arc<dyn Clock>>,
    ttl_secs: u64,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: None,
            ttl_secs: 300,
        }
    }

    pub fn with_store(mut self, store: MockRedemptionStore) -> Self {
        self.store = Some(store);
        self
    }

    #[allow(dead_code)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[allow(dead_code)]
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    pub fn build(self) -> AppState {
        let store: Arc<dyn RedemptionStore> =
            Arc::new(self.store.unwrap_or_else(MockRedemptionStore::new));
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(ManualClock::new(Utc::now())));

        AppState {
            config: test_config(),
            store: store.clone(),
            redemption: RedemptionService::new(store, clock, self.ttl_secs),
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
