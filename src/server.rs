use crate::config::Config;
use crate::error::StoreError;
use crate::handlers::{health, limited, open};
use crate::limiter::RateLimiter;
use crate::settings::{LimiterOptions, RouteOptions};
use crate::store::redis::RedisStore;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Demo router showing the three route shapes: inheriting the limiter
/// defaults, overriding per route, and staying out entirely.
pub fn create_app(limiter: &RateLimiter) -> Router {
    Router::new()
        .route(
            "/limited",
            get(limited).route_layer(limiter.route(RouteOptions::enabled())),
        )
        .route(
            "/strict",
            get(limited).route_layer(limiter.route(RouteOptions::enabled().limit(5))),
        )
        .route("/open", get(open))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, StoreError> {
        let mut options = LimiterOptions::new()
            .limit(config.limit)
            .ttl(Duration::from_millis(config.ttl_ms));

        if !config.redis_url.is_empty() {
            let store = RedisStore::connect(&config.redis_url).await?;
            options = options.store(Arc::new(store));
        }

        let limiter = RateLimiter::new(options);

        Ok(Self {
            app: create_app(&limiter),
            bind_addr: config.bind_addr,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("rategate server listening on {}", self.bind_addr);

        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
