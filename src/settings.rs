//! Three-layer configuration: built-in defaults, limiter-wide options,
//! per-route options. Merging is field-wise, route over global over
//! defaults, so a route may override a single field and inherit the rest.

use crate::key::{default_key_fn, KeyFn};
use crate::store::CounterStore;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LIMIT: u32 = 15;
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Limiter-wide overrides supplied when the limiter is built.
///
/// `limit` and `ttl` deserialize from configuration files (`ttl` accepts
/// humantime strings such as `"15m"`); the key function and store are
/// code-level concerns and can only be set programmatically.
#[derive(Default, Clone, Deserialize)]
#[serde(default)]
pub struct LimiterOptions {
    pub limit: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub ttl: Option<Duration>,
    #[serde(skip)]
    pub key_fn: Option<KeyFn>,
    #[serde(skip)]
    pub store: Option<Arc<dyn CounterStore>>,
}

impl LimiterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn key_fn(mut self, key_fn: KeyFn) -> Self {
        self.key_fn = Some(key_fn);
        self
    }

    pub fn store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = Some(store);
        self
    }
}

/// Per-route options. Rate limiting is strictly opt-in: `enable` defaults
/// to false, and a disabled route passes through with no accounting and
/// no headers.
#[derive(Default, Clone, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub enable: bool,
    pub limit: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub ttl: Option<Duration>,
    #[serde(skip)]
    pub key_fn: Option<KeyFn>,
    #[serde(skip)]
    pub store: Option<Arc<dyn CounterStore>>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self {
            enable: true,
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn key_fn(mut self, key_fn: KeyFn) -> Self {
        self.key_fn = Some(key_fn);
        self
    }

    pub fn store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = Some(store);
        self
    }
}

/// Fully resolved settings for one route. Built once when the route layer
/// is constructed, immutable afterwards.
#[derive(Clone)]
pub struct EffectiveSettings {
    pub enabled: bool,
    pub limit: u32,
    pub ttl: Duration,
    pub key_fn: KeyFn,
    pub store: Arc<dyn CounterStore>,
}

pub fn resolve(
    global: &LimiterOptions,
    fallback_store: &Arc<dyn CounterStore>,
    route: &RouteOptions,
) -> EffectiveSettings {
    EffectiveSettings {
        enabled: route.enable,
        limit: route.limit.or(global.limit).unwrap_or(DEFAULT_LIMIT),
        ttl: route.ttl.or(global.ttl).unwrap_or(DEFAULT_TTL),
        key_fn: route
            .key_fn
            .clone()
            .or_else(|| global.key_fn.clone())
            .unwrap_or_else(default_key_fn),
        store: route
            .store
            .clone()
            .or_else(|| global.store.clone())
            .unwrap_or_else(|| fallback_store.clone()),
    }
}
