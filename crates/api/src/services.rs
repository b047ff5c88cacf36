//! Redemption orchestration.
//!
//! The service layer sits between the transport adapter and the store: it
//! validates input, reads the injected clock once per attempt, and maps
//! store outcomes onto the caller-facing taxonomy. Handlers never call the
//! store directly.
//!
//! ## Usage in Handlers
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let redemption = state.redemption.redeem(&payload.token).await?;
//! }
//! ```

mod redemption;

pub use redemption::{RedeemError, Redemption, RedemptionService, ViewOutcome};
