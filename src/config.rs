use envconfig::Envconfig;
use std::net::SocketAddr;

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Redis connection URL; empty selects the in-memory store
    #[envconfig(from = "REDIS_URL", default = "")]
    pub redis_url: String,

    /// Requests allowed per window on rate limited routes
    #[envconfig(from = "RATE_LIMIT", default = "15")]
    pub limit: u32,

    /// Window length in milliseconds
    #[envconfig(from = "RATE_TTL_MS", default = "900000")]
    pub ttl_ms: u64,

    /// Log level for the service target
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }
}
