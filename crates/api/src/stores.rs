//! Redemption state stores.
//!
//! This module contains the trait and implementations for the token
//! redemption state machine. A token is "currently redeemed" exactly while a
//! record for it exists with an expiry in the future; once the window
//! passes, the token is redeemable again (TTL is a reuse cooldown, not a
//! permanent lock).
//!
//! ## Backends
//!
//! - **redemption** - trait, outcome/error types, and the shared Redis
//!   backend (atomic across service instances via `SET NX EX`)
//! - **memory** - process-local backend for single-instance deployments;
//!   volatile across restarts
//!
//! Both backends produce identical outcomes for the same sequence of calls
//! with the same timestamps; the conformance test below exercises that.
//!
//! ## Redis Key Patterns
//!
//! ```text
//! redemption:{token} → first-redemption unix timestamp (auto-expires via TTL)
//! ```
//!
//! ## Usage in Handlers
//!
//! Handlers never touch the store directly; they go through
//! `state.redemption` (the [`crate::services::RedemptionService`]), which
//! owns input validation and clock reads.

mod memory;
mod redemption;

pub use memory::MemoryRedemptionStore;
pub use redemption::{RedeemOutcome, RedemptionStore, RedisRedemptionStore, StoreError};

#[cfg(test)]
pub use redemption::MockRedemptionStore;
