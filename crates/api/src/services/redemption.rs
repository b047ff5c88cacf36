//! One-shot token redemption.
//!
//! A token may be redeemed once per TTL window. The first successful attempt
//! opens the window; every later attempt inside it is rejected; once the
//! window lapses the token is redeemable again. The view path marks the
//! token on first sight so a link can render differently the second time it
//! is opened.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::clock::Clock;
use crate::stores::{RedeemOutcome, RedemptionStore, StoreError};

/// Why a redemption attempt did not produce an outcome for the caller.
#[derive(Debug, Error)]
pub enum RedeemError {
    /// Caller error; surfaced immediately, nothing was written.
    #[error("token must not be empty")]
    InvalidToken,
    /// Legitimate business outcome, not an infrastructure fault: the token
    /// is inside an active window.
    #[error("token already used")]
    AlreadyUsed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A successful one-shot redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub token: String,
    /// End of the reuse cooldown.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a page-style view access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// First open inside this window; the token is now marked used.
    FirstView,
    /// The token was already active; nothing was written.
    AlreadyViewed,
}

/// Orchestrates redemption attempts against an injected store and clock.
///
/// Holds no mutable state of its own, so clones share the same store and are
/// cheap to pass into the router.
#[derive(Clone)]
pub struct RedemptionService {
    store: Arc<dyn RedemptionStore>,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl RedemptionService {
    /// `ttl_secs` must be positive; the config layer enforces that before
    /// construction.
    pub fn new(store: Arc<dyn RedemptionStore>, clock: Arc<dyn Clock>, ttl_secs: u64) -> Self {
        Self {
            store,
            clock,
            ttl_secs,
        }
    }

    /// One-shot redemption. Exactly one of N concurrent calls for the same
    /// token succeeds; the rest see `AlreadyUsed` until the window lapses.
    pub async fn redeem(&self, token: &str) -> Result<Redemption, RedeemError> {
        if token.is_empty() {
            return Err(RedeemError::InvalidToken);
        }

        let now = self.clock.now();
        match self.store.try_redeem(token, now, self.ttl_secs).await? {
            RedeemOutcome::Redeemed => {
                let expires_at = now + Duration::seconds(self.ttl_secs as i64);
                tracing::info!(token, %expires_at, "token redeemed");

                Ok(Redemption {
                    token: token.to_string(),
                    expires_at,
                })
            }
            RedeemOutcome::AlreadyUsed => Err(RedeemError::AlreadyUsed),
        }
    }

    /// Page-style access: reports the current state and marks the token used
    /// on first sight. Repeat views inside the window mutate nothing.
    pub async fn view(&self, token: &str) -> Result<ViewOutcome, RedeemError> {
        if token.is_empty() {
            return Err(RedeemError::InvalidToken);
        }

        let now = self.clock.now();
        if self.store.is_active(token, now).await? {
            return Ok(ViewOutcome::AlreadyViewed);
        }

        match self.store.try_redeem(token, now, self.ttl_secs).await? {
            RedeemOutcome::Redeemed => {
                tracing::info!(token, "token redeemed on first view");
                Ok(ViewOutcome::FirstView)
            }
            // Another caller marked the token between the status read and the
            // mark; they are the first viewer, not us.
            RedeemOutcome::AlreadyUsed => Ok(ViewOutcome::AlreadyViewed),
        }
    }
}
