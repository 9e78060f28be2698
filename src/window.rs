//! Fixed-window accounting against a TTL key-value store.

use crate::error::StoreError;
use crate::store::{CounterRecord, CounterStore};
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The result of one accounting pass, attached to the request while it is
/// in flight and surfaced as response headers.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub limit: u32,
    pub remaining: i64,
    /// Window expiry as epoch milliseconds.
    pub reset_ms: u64,
    pub rejected: bool,
}

impl Outcome {
    /// Wire value for the remaining header; never negative even when the
    /// stored counter is.
    pub fn remaining_header(&self) -> i64 {
        self.remaining.max(0)
    }
}

/// Runs one accounting pass for `key`.
///
/// A fresh key opens a window: the counter starts at `limit - 1` with the
/// full `ttl`. An existing counter is decremented and written back with
/// the store's live remaining TTL, so the window boundary never slides
/// forward. A decrement that would drop below zero rejects the request
/// and leaves the stored record untouched, keeping the expiry unaffected
/// by rejected traffic.
///
/// `get` and `set` are separate store calls, so two concurrent requests
/// on one key can read the same counter and write the same decrement,
/// letting slightly more than `limit` requests through under contention.
/// A store with an atomic decrement-and-expire primitive would close that
/// gap at the cost of the portable get/set contract.
pub async fn check(
    store: &dyn CounterStore,
    key: &str,
    limit: u32,
    ttl: Duration,
) -> Result<Outcome, StoreError> {
    match store.get(key).await? {
        None => {
            let remaining = i64::from(limit) - 1;
            store.set(key, CounterRecord { remaining }, ttl).await?;

            tracing::debug!(key, limit, remaining, "opened rate limit window");

            Ok(Outcome {
                limit,
                remaining,
                reset_ms: epoch_ms_after(ttl),
                rejected: remaining < 0,
            })
        }
        Some(cached) => {
            let remaining = cached.record.remaining - 1;
            let reset_ms = epoch_ms_after(cached.remaining_ttl);

            if remaining < 0 {
                tracing::debug!(key, limit, "rate limit window exhausted");

                return Ok(Outcome {
                    limit,
                    remaining: 0,
                    reset_ms,
                    rejected: true,
                });
            }

            store
                .set(key, CounterRecord { remaining }, cached.remaining_ttl)
                .await?;

            Ok(Outcome {
                limit,
                remaining,
                reset_ms,
                rejected: false,
            })
        }
    }
}

fn epoch_ms_after(ttl: Duration) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now + ttl).as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::CachedCounter;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Store stub with a scripted `get` response and recorded `set` calls.
    #[derive(Default)]
    struct ScriptedStore {
        cached: Option<CachedCounter>,
        fail_get: bool,
        fail_set: bool,
        sets: Mutex<Vec<(String, CounterRecord, Duration)>>,
    }

    impl ScriptedStore {
        fn with_cached(record: CounterRecord, remaining_ttl: Duration) -> Self {
            Self {
                cached: Some(CachedCounter {
                    record,
                    remaining_ttl,
                }),
                ..Self::default()
            }
        }

        fn sets(&self) -> Vec<(String, CounterRecord, Duration)> {
            self.sets.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CounterStore for ScriptedStore {
        async fn get(&self, _key: &str) -> Result<Option<CachedCounter>, StoreError> {
            if self.fail_get {
                return Err(StoreError::Unavailable("scripted get failure".into()));
            }
            Ok(self.cached.clone())
        }

        async fn set(
            &self,
            key: &str,
            record: CounterRecord,
            ttl: Duration,
        ) -> Result<(), StoreError> {
            if self.fail_set {
                return Err(StoreError::Unavailable("scripted set failure".into()));
            }
            self.sets
                .lock()
                .unwrap()
                .push((key.to_string(), record, ttl));
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_request_opens_window_with_limit_minus_one() {
        let store = MemoryStore::new();
        let outcome = check(&store, "k", 15, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!outcome.rejected);
        assert_eq!(outcome.limit, 15);
        assert_eq!(outcome.remaining, 14);

        let cached = store.get("k").await.unwrap().unwrap();
        assert_eq!(cached.record.remaining, 14);
    }

    #[tokio::test]
    async fn decrements_by_one_until_exhausted_then_rejects() {
        let store = MemoryStore::new();

        for expected in (0..3).rev() {
            let outcome = check(&store, "k", 3, Duration::from_secs(60))
                .await
                .unwrap();
            assert!(!outcome.rejected);
            assert_eq!(outcome.remaining, expected);
        }

        let outcome = check(&store, "k", 3, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(outcome.rejected);
        assert_eq!(outcome.remaining, 0);
        assert_eq!(outcome.remaining_header(), 0);
    }

    #[tokio::test]
    async fn rejection_does_not_write_the_store() {
        let store = ScriptedStore::with_cached(
            CounterRecord { remaining: 0 },
            Duration::from_secs(30),
        );

        let outcome = check(&store, "k", 5, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(outcome.rejected);
        assert!(store.sets().is_empty());
    }

    #[tokio::test]
    async fn repeated_rejections_leave_record_unchanged() {
        let store = MemoryStore::new();

        let _ = check(&store, "k", 1, Duration::from_secs(60)).await.unwrap();
        let before = store.get("k").await.unwrap().unwrap().record;

        for _ in 0..3 {
            let outcome = check(&store, "k", 1, Duration::from_secs(60))
                .await
                .unwrap();
            assert!(outcome.rejected);
        }

        let after = store.get("k").await.unwrap().unwrap().record;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn updates_reuse_the_live_ttl_not_the_configured_window() {
        let store = ScriptedStore::with_cached(
            CounterRecord { remaining: 7 },
            Duration::from_secs(5),
        );

        let outcome = check(&store, "k", 15, Duration::from_secs(900))
            .await
            .unwrap();

        assert_eq!(outcome.remaining, 6);

        let sets = store.sets();
        assert_eq!(sets.len(), 1);
        let (_, record, ttl) = &sets[0];
        assert_eq!(record.remaining, 6);
        assert_eq!(*ttl, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn reset_tracks_live_ttl() {
        let store = ScriptedStore::with_cached(
            CounterRecord { remaining: 7 },
            Duration::from_secs(5),
        );

        let before_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let outcome = check(&store, "k", 15, Duration::from_secs(900))
            .await
            .unwrap();

        // Reset lands ~5s out (the live TTL), nowhere near the 900s window.
        assert!(outcome.reset_ms >= before_ms + 4_000);
        assert!(outcome.reset_ms <= before_ms + 10_000);
    }

    #[tokio::test]
    async fn zero_limit_rejects_the_first_request_of_each_window() {
        let store = MemoryStore::new();
        let outcome = check(&store, "k", 0, Duration::from_secs(60))
            .await
            .unwrap();

        assert!(outcome.rejected);
        assert_eq!(outcome.remaining, -1);
        assert_eq!(outcome.remaining_header(), 0);

        // The opening write still happened, pinning the window.
        let cached = store.get("k").await.unwrap().unwrap();
        assert_eq!(cached.record.remaining, -1);
    }

    #[tokio::test]
    async fn propagates_get_failure() {
        let store = ScriptedStore {
            fail_get: true,
            ..ScriptedStore::default()
        };

        let result = check(&store, "k", 15, Duration::from_secs(60)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn propagates_set_failure_on_new_window() {
        let store = ScriptedStore {
            fail_set: true,
            ..ScriptedStore::default()
        };

        let result = check(&store, "k", 15, Duration::from_secs(60)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn propagates_set_failure_on_update() {
        let store = ScriptedStore {
            cached: Some(CachedCounter {
                record: CounterRecord { remaining: 3 },
                remaining_ttl: Duration::from_secs(10),
            }),
            fail_set: true,
            ..ScriptedStore::default()
        };

        let result = check(&store, "k", 15, Duration::from_secs(60)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn window_expiry_restores_quota() {
        let store = MemoryStore::new();

        let first = check(&store, "k", 1, Duration::from_millis(40))
            .await
            .unwrap();
        assert!(!first.rejected);

        let second = check(&store, "k", 1, Duration::from_millis(40))
            .await
            .unwrap();
        assert!(second.rejected);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let third = check(&store, "k", 1, Duration::from_millis(40))
            .await
            .unwrap();
        assert!(!third.rejected);
        assert_eq!(third.remaining, 0);
    }
}
