//! Redemption store contract and the shared Redis backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result of an atomic redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// The token had no active record; one now exists for the full TTL.
    Redeemed,
    /// The token is inside an active window. Nothing was written.
    AlreadyUsed,
}

/// Store failures, kept distinct so the transport layer never conflates an
/// infrastructure fault with the legitimate already-used outcome.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or timed out. Transient; the caller may retry the
    /// whole request. The store itself never retries — `try_redeem` may have
    /// committed on the far side, and only the backend's atomic primitive
    /// makes a retry safe.
    #[error("redemption store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    /// Unexpected backend behavior (protocol or data shape). Fails the
    /// request loudly rather than guessing at redemption state.
    #[error("redemption store backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Store for per-token redemption state.
///
/// `try_redeem` is the single atomic primitive everything else builds on: a
/// check-and-set, not a check-then-set. Two concurrent calls for the same
/// token yield exactly one `Redeemed` regardless of arrival order. Callers
/// supply `now` so expiry logic stays clock-injectable; `ttl_secs` must be
/// positive (enforced at configuration time).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedemptionStore: Send + Sync {
    /// Health check - verify backend connectivity.
    async fn health_check(&self) -> Result<bool, StoreError>;

    /// Atomically redeem `token` unless it is inside an active window.
    /// On success the window runs for `ttl_secs` from `now`.
    async fn try_redeem(
        &self,
        token: &str,
        now: DateTime<Utc>,
        ttl_secs: u64,
    ) -> Result<RedeemOutcome, StoreError>;

    /// Whether `token` is currently redeemed (active record, not yet
    /// expired). Pure read: the answer never depends on reclamation, and an
    /// expired record always reads as inactive.
    async fn is_active(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;
}

/// Per-operation deadline; a slow backend surfaces as `Unavailable` instead
/// of stalling the request.
const OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis implementation of RedemptionStore.
///
/// Safe to share across many service instances: the check-and-set rides on
/// Redis' native `SET NX EX`, and expiry is enforced by Redis' own TTL
/// rather than recomputed from locally-read clocks, so instance clock skew
/// cannot reopen or extend a window.
#[derive(Clone)]
pub struct RedisRedemptionStore {
    client: redis::Client,
}

impl RedisRedemptionStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn redemption_key(token: &str) -> String {
        format!("redemption:{}", token)
    }
}

#[async_trait]
impl RedemptionStore for RedisRedemptionStore {
    async fn health_check(&self) -> Result<bool, StoreError> {
        let client = self.client.clone();
        let result: String = with_timeout(async move {
            let mut conn = client.get_multiplexed_async_connection().await?;
            redis::cmd("PING").query_async(&mut conn).await
        })
        .await?;

        Ok(result == "PONG")
    }

    async fn try_redeem(
        &self,
        token: &str,
        now: DateTime<Utc>,
        ttl_secs: u64,
    ) -> Result<RedeemOutcome, StoreError> {
        let key = Self::redemption_key(token);
        let client = self.client.clone();

        // Single round trip keeps the check-and-set atomic. The stored value
        // (first-redemption timestamp) exists for operator debugging only and
        // is never read back.
        let reply: Option<String> = with_timeout(async move {
            redis::cmd("SET")
                .arg(&key)
                .arg(now.timestamp())
                .arg("NX")
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut client.get_multiplexed_async_connection().await?)
                .await
        })
        .await?;

        // NX: "OK" when the key was absent (or its TTL had lapsed), nil when
        // an unexpired record already holds the token.
        if reply.is_some() {
            Ok(RedeemOutcome::Redeemed)
        } else {
            Ok(RedeemOutcome::AlreadyUsed)
        }
    }

    async fn is_active(&self, token: &str, _now: DateTime<Utc>) -> Result<bool, StoreError> {
        let key = Self::redemption_key(token);
        let client = self.client.clone();

        // Expired keys read as absent; Redis reclaims them on its own.
        let exists: bool = with_timeout(async move {
            redis::cmd("EXISTS")
                .arg(&key)
                .query_async(&mut client.get_multiplexed_async_connection().await?)
                .await
        })
        .await?;

        Ok(exists)
    }
}

/// Runs one Redis operation under the store deadline and classifies failures.
async fn with_timeout<T, F>(op: F) -> Result<T, StoreError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(OP_TIMEOUT, op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(classify(err)),
        Err(_) => Err(StoreError::Unavailable(anyhow::anyhow!(
            "operation exceeded {OP_TIMEOUT:?} deadline"
        ))),
    }
}

fn classify(err: redis::RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_timeout()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
    {
        StoreError::Unavailable(err.into())
    } else {
        StoreError::Backend(err.into())
    }
}
