//! Counter storage backing the fixed-window accounting.

pub mod memory;
pub mod redis;

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Quota state persisted per key.
///
/// `remaining` is signed: a window opened with `limit = 0` stores `-1`,
/// which keeps every request of that window rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub remaining: i64,
}

/// A record read back from the store together with the store-reported
/// time left before it expires.
#[derive(Debug, Clone)]
pub struct CachedCounter {
    pub record: CounterRecord,
    pub remaining_ttl: Duration,
}

/// Key-value counter storage with TTL support.
///
/// `get` and `set` are two independent operations; nothing here is
/// transactional. Implementations must report the live remaining TTL on
/// every read, since the accounting layer re-persists records against
/// that value rather than the configured window length.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch the record for `key`. Expired or missing records are `None`.
    async fn get(&self, key: &str) -> Result<Option<CachedCounter>, StoreError>;

    /// Persist `record` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, record: CounterRecord, ttl: Duration)
        -> Result<(), StoreError>;
}
