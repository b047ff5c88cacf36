//! Shared API request/response types used by the redemption server and its clients.

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// One-shot redemption request. The token is the opaque string carried by
/// the QR code or link; the server imposes no format beyond non-empty.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RedeemPayload {
    #[garde(length(min = 1))]
    pub token: String,
}

/// Returned after a successful redemption.
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub token: String,
    /// End of the reuse cooldown. The token becomes redeemable again after this.
    pub expires_at: DateTime<Utc>,
}

/// Returned by the view endpoint. The page layer renders the private content
/// on the first view and a warning on every repeat view within the window.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewResponse {
    pub token: String,
    pub already_viewed: bool,
}
