use crate::middleware::RateLimitLayer;
use crate::settings::{resolve, LimiterOptions, RouteOptions};
use crate::store::memory::MemoryStore;
use crate::store::CounterStore;
use std::sync::Arc;

/// The limiter built once at service start. Holds the limiter-wide
/// options and the store every route falls back to, and hands out
/// per-route layers with fully resolved settings.
#[derive(Clone)]
pub struct RateLimiter {
    global: LimiterOptions,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    /// Build a limiter from limiter-wide options. When no store is
    /// supplied an in-memory one is created and shared by every route
    /// this limiter produces.
    pub fn new(global: LimiterOptions) -> Self {
        let store = global
            .store
            .clone()
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        Self { global, store }
    }

    /// The store routes fall back to when they carry no override.
    pub fn store(&self) -> Arc<dyn CounterStore> {
        self.store.clone()
    }

    /// Resolve `route` against the limiter-wide options and built-in
    /// defaults, producing the layer to attach to that route.
    pub fn route(&self, route: RouteOptions) -> RateLimitLayer {
        RateLimitLayer::new(resolve(&self.global, &self.store, &route))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterOptions::default())
    }
}
