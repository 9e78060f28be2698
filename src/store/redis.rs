use crate::error::StoreError;
use crate::store::{CachedCounter, CounterRecord, CounterStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;

const DEFAULT_PREFIX: &str = "rategate";

/// Redis-backed counter store.
///
/// Records are stored as JSON strings under a namespaced key and expired
/// by Redis itself (`SET ... PX`). Reads pipeline `GET` with `PTTL` so the
/// caller always sees the live remaining window alongside the value.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            prefix: DEFAULT_PREFIX.to_string(),
        })
    }

    /// Replace the key namespace. Useful when several limiters share one
    /// Redis database.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    fn full_key(&self, key: &str) -> String {
        namespaced(&self.prefix, key)
    }
}

fn namespaced(prefix: &str, key: &str) -> String {
    format!("{}:{}", prefix, key)
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CachedCounter>, StoreError> {
        let full_key = self.full_key(key);
        let mut conn = self.conn.clone();

        let (raw, pttl_ms): (Option<String>, i64) = redis::pipe()
            .cmd("GET")
            .arg(&full_key)
            .cmd("PTTL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        // PTTL is negative for a missing key or one with no expiry; either
        // way the window is gone and the record is as good as absent.
        if pttl_ms <= 0 {
            return Ok(None);
        }

        let record: CounterRecord = serde_json::from_str(&raw)?;

        Ok(Some(CachedCounter {
            record,
            remaining_ttl: Duration::from_millis(pttl_ms as u64),
        }))
    }

    async fn set(
        &self,
        key: &str,
        record: CounterRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let full_key = self.full_key(key);
        let raw = serde_json::to_string(&record)?;
        let mut conn = self.conn.clone();

        redis::cmd("SET")
            .arg(&full_key)
            .arg(raw)
            .arg("PX")
            .arg((ttl.as_millis() as u64).max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }
}
