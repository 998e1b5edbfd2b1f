//! Revoked bearer token tracking.
//!
//! # Purpose
//! Remembers tokens that were logged out before their natural expiry so the
//! gateway can reject them. The store is the source of truth; a `DashMap`
//! cache in front of it answers repeat lookups without a round trip.
//!
//! # Key invariants
//! - Entries are keyed by [`token_hash`], never by the raw token.
//! - An entry only blocks a token while `expires_at` is in the future; after
//!   that the token fails verification on its own.
//! - The cache may lag the store in either direction. A cache miss always
//!   falls back to the store, so dropping the cache loses latency, not
//!   correctness.
use crate::store::{GatewayStore, StoreResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

const HASH_LEN: usize = 32;

/// Key a token by its last 32 characters (the whole token when shorter).
///
/// The signature segment sits at the end of a JWT, so the suffix is unique
/// per token without storing a replayable credential.
pub fn token_hash(token: &str) -> String {
    let count = token.chars().count();
    token.chars().skip(count.saturating_sub(HASH_LEN)).collect()
}

#[derive(Clone)]
pub struct TokenBlacklist {
    store: Arc<dyn GatewayStore + Send + Sync>,
    cache: Arc<DashMap<String, DateTime<Utc>>>,
}

impl TokenBlacklist {
    pub fn new(store: Arc<dyn GatewayStore + Send + Sync>) -> Self {
        Self {
            store,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Revoke `token` until `expires_at`.
    ///
    /// # Errors
    /// - Store write failures. The cache is only updated after the store
    ///   accepted the entry.
    pub async fn blacklist(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let hash = token_hash(token);
        self.store.blacklist_token(&hash, user_id, expires_at).await?;
        self.cache.insert(hash, expires_at);
        metrics::counter!("cdf_tokens_blacklisted_total").increment(1);
        Ok(())
    }

    pub async fn is_blacklisted(&self, token: &str) -> StoreResult<bool> {
        let hash = token_hash(token);
        let now = Utc::now();
        if let Some(entry) = self.cache.get(&hash)
            && *entry > now
        {
            return Ok(true);
        }
        match self.store.blacklisted_until(&hash, now).await? {
            Some(expires_at) => {
                self.cache.insert(hash, expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop expired entries from the store and the cache. Returns the number
    /// of store rows removed.
    pub async fn cleanup_expired(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let removed = self.store.delete_expired_tokens(now).await?;
        self.cache.retain(|_, expires_at| *expires_at > now);
        tracing::debug!(removed, cached = self.cache.len(), "token blacklist sweep");
        Ok(removed)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
