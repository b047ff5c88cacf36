//! HTTP handlers.
//!
//! Thin transport adapters over the redemption service: parse and validate
//! the request, call into the core, translate the outcome into a status code
//! and JSON body. No redemption logic lives here.

pub mod health;
pub mod redemptions;
