//! Process-local redemption store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{RedeemOutcome, RedemptionStore, StoreError};

/// In-memory implementation of RedemptionStore for single-instance
/// deployments. State does not survive a restart.
///
/// The map is sharded, and `try_redeem` does its read-check-write under the
/// entry guard for the token's shard, so concurrent attempts on the same
/// token serialize while attempts on different tokens almost never contend.
///
/// Expired records are dropped lazily when a read observes them; a token
/// redeemed once and never queried again would otherwise pin its record
/// forever, so the binary also runs [`purge_expired`](Self::purge_expired)
/// on an interval.
#[derive(Default)]
pub struct MemoryRedemptionStore {
    records: DashMap<String, DateTime<Utc>>,
}

impl MemoryRedemptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every record whose window has closed. Returns the number of
    /// records reclaimed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.records.len())
    }
}

#[async_trait]
impl RedemptionStore for MemoryRedemptionStore {
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn try_redeem(
        &self,
        token: &str,
        now: DateTime<Utc>,
        ttl_secs: u64,
    ) -> Result<RedeemOutcome, StoreError> {
        let expires_at = now + Duration::seconds(ttl_secs as i64);

        match self.records.entry(token.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    Ok(RedeemOutcome::AlreadyUsed)
                } else {
                    // Window lapsed: the record is logically dead, overwrite it.
                    entry.insert(expires_at);
                    Ok(RedeemOutcome::Redeemed)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                Ok(RedeemOutcome::Redeemed)
            }
        }
    }

    async fn is_active(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let active = self
            .records
            .get(token)
            .is_some_and(|expires_at| *expires_at > now);

        if !active {
            // Reclaim the dead record, but only if it is still dead: another
            // caller may have re-redeemed the token since the read above.
            self.records.remove_if(token, |_, expires_at| *expires_at <= now);
        }

        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const TTL: u64 = 300;

    #[tokio::test]
    async fn fresh_token_redeems() {
        let store = MemoryRedemptionStore::new();
        let now = Utc::now();

        let outcome = store.try_redeem("DENEME999", now, TTL).await.unwrap();

        assert_eq!(outcome, RedeemOutcome::Redeemed);
        assert!(store.is_active("DENEME999", now).await.unwrap());
    }

    #[tokio::test]
    async fn second_redeem_inside_window_is_rejected() {
        let store = MemoryRedemptionStore::new();
        let t0 = Utc::now();

        store.try_redeem("DENEME999", t0, TTL).await.unwrap();

        // Just before expiry the window must still hold.
        let just_before = t0 + Duration::seconds(TTL as i64 - 1);
        let outcome = store
            .try_redeem("DENEME999", just_before, TTL)
            .await
            .unwrap();

        assert_eq!(outcome, RedeemOutcome::AlreadyUsed);
    }

    #[tokio::test]
    async fn window_reopens_after_expiry() {
        let store = MemoryRedemptionStore::new();
        let t0 = Utc::now();

        store.try_redeem("DENEME999", t0, TTL).await.unwrap();

        let after = t0 + Duration::seconds(TTL as i64 + 1);
        let outcome = store.try_redeem("DENEME999", after, TTL).await.unwrap();

        assert_eq!(outcome, RedeemOutcome::Redeemed);
    }

    #[tokio::test]
    async fn record_expiring_exactly_now_reads_as_dead() {
        // "Active" means expiry strictly in the future.
        let store = MemoryRedemptionStore::new();
        let t0 = Utc::now();

        store.try_redeem("DENEME999", t0, TTL).await.unwrap();

        let at_expiry = t0 + Duration::seconds(TTL as i64);
        assert!(!store.is_active("DENEME999", at_expiry).await.unwrap());
        assert_eq!(
            store.try_redeem("DENEME999", at_expiry, TTL).await.unwrap(),
            RedeemOutcome::Redeemed
        );
    }

    #[tokio::test]
    async fn expired_record_is_reclaimed_on_read() {
        let store = MemoryRedemptionStore::new();
        let t0 = Utc::now();

        store.try_redeem("DENEME999", t0, TTL).await.unwrap();
        assert_eq!(store.records.len(), 1);

        let after = t0 + Duration::seconds(TTL as i64 + 1);
        assert!(!store.is_active("DENEME999", after).await.unwrap());
        assert_eq!(store.records.len(), 0);
    }

    #[tokio::test]
    async fn purge_drops_only_dead_records() {
        let store = MemoryRedemptionStore::new();
        let t0 = Utc::now();

        store.try_redeem("stale", t0, TTL).await.unwrap();
        store
            .try_redeem("live", t0 + Duration::seconds(200), TTL)
            .await
            .unwrap();

        let purged = store.purge_expired(t0 + Duration::seconds(TTL as i64 + 1));

        assert_eq!(purged, 1);
        assert!(!store.records.contains_key("stale"));
        assert!(store.records.contains_key("live"));
    }

    #[tokio::test]
    async fn concurrent_redeems_have_a_single_winner() {
        let store = Arc::new(MemoryRedemptionStore::new());
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.try_redeem("DENEME999", now, TTL).await.unwrap()
            }));
        }

        let mut redeemed = 0;
        let mut already_used = 0;
        for handle in handles {
            match handle.await.unwrap() {
                RedeemOutcome::Redeemed => redeemed += 1,
                RedeemOutcome::AlreadyUsed => already_used += 1,
            }
        }

        assert_eq!(redeemed, 1);
        assert_eq!(already_used, 31);
    }
}
