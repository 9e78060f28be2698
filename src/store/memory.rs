use crate::error::StoreError;
use crate::store::{CachedCounter, CounterRecord, CounterStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-process counter store. This is the default backing store when no
/// external store is supplied.
///
/// Entries are evicted lazily: an expired record is dropped the next time
/// its key is read. `purge_expired` is available for housekeeping on
/// long-lived processes with churning key sets.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    record: CounterRecord,
    expires_at: Instant,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock_entries()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }

    /// Number of live entries, counting any not yet evicted.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock_entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock_entries()?.is_empty())
    }

    fn lock_entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Internal("counter map lock poisoned".to_string()))
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CachedCounter>, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock_entries()?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(CachedCounter {
                record: entry.record,
                remaining_ttl: entry.expires_at - now,
            })),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        record: CounterRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let entry = Entry {
            record,
            expires_at: Instant::now() + ttl,
        };
        self.lock_entries()?.insert(key.to_string(), entry);
        Ok(())
    }
}
