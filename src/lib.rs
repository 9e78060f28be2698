pub mod config;
pub mod error;
pub mod handlers;
pub mod key;
pub mod limiter;
pub mod middleware;
pub mod response;
pub mod server;
pub mod settings;
pub mod store;
pub mod window;

pub use error::StoreError;
pub use key::{default_key_fn, KeyFn, RequestInfo};
pub use limiter::RateLimiter;
pub use middleware::RateLimitLayer;
pub use response::ErrorResponse;
pub use server::create_app;
pub use settings::{EffectiveSettings, LimiterOptions, RouteOptions};
pub use store::memory::MemoryStore;
pub use store::redis::RedisStore;
pub use store::{CachedCounter, CounterRecord, CounterStore};
pub use window::Outcome;
