//! Token redemption endpoints.
//!
//! A token (usually carried by a QR code or link) may be redeemed once per
//! TTL window. Two access patterns share the same underlying state:
//!
//! - POST /redeem - one-shot API redemption; repeat calls inside the window
//!   get 403 until the cooldown lapses
//! - GET /view/{token} - page-style access; the first open marks the token
//!   and the response tells the page layer whether to render the private
//!   content or the already-used warning
//!
//! ## Outcome → status mapping
//!
//! ```text
//! success            → 200
//! empty token        → 400
//! already used       → 403
//! store unreachable  → 503 (never conflated with 403)
//! backend bug        → 500
//! ```

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use garde::Validate;
use shared::api::{RedeemPayload, RedeemResponse, ViewResponse};

use crate::{
    error::AppError,
    services::{RedeemError, ViewOutcome},
    state::AppState,
    stores::StoreError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/redeem", post(redeem_token))
        .route("/view/{token}", get(view_token))
}

#[debug_handler]
async fn redeem_token(
    State(state): State<AppState>,
    Json(payload): Json<RedeemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let redemption = state
        .redemption
        .redeem(&payload.token)
        .await
        .map_err(redeem_error)?;

    Ok((
        StatusCode::OK,
        Json(RedeemResponse {
            token: redemption.token,
            expires_at: redemption.expires_at,
        }),
    ))
}

#[debug_handler]
async fn view_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.redemption.view(&token).await.map_err(redeem_error)?;

    Ok(Json(ViewResponse {
        token,
        already_viewed: outcome == ViewOutcome::AlreadyViewed,
    }))
}

/// Maps service outcomes onto transport responses. `AlreadyUsed` is a
/// business outcome and `Unavailable` an infrastructure fault; they must
/// stay distinguishable for the caller.
fn redeem_error(err: RedeemError) -> AppError {
    match err {
        RedeemError::InvalidToken => AppError::Validation(err.to_string()),
        RedeemError::AlreadyUsed => AppError::External(StatusCode::FORBIDDEN, "Token already used"),
        RedeemError::Store(StoreError::Unavailable(err)) => {
            tracing::warn!(error = ?err, "redemption store unavailable");
            AppError::External(
                StatusCode::SERVICE_UNAVAILABLE,
                "Redemption service temporarily unavailable",
            )
        }
        RedeemError::Store(StoreError::Backend(err)) => AppError::Internal(err),
    }
}
