use std::net::SocketAddr;

use tracing::{info, warn};

const DEFAULT_PORT: u16 = 9500;
const DEFAULT_DISPATCH_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_CONNECTION_BUFFER_CAPACITY: usize = 64;

/// Runtime configuration, collected from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// Whether destroying a follow relationship produces an `unfollowed`
    /// notification. Off by default.
    pub notify_on_unfollow: bool,
    /// Capacity of the broadcast dispatch queue. Jobs beyond this are
    /// dropped with a warning, never blocking the request path.
    pub dispatch_queue_capacity: usize,
    /// Outbound buffer per live websocket connection. A connection that
    /// falls this far behind is disconnected.
    pub connection_buffer_capacity: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidVar(&'static str, String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        // The JWT secret is read lazily by the auth module; fail fast here
        // so a misconfigured deployment does not come up half-working.
        if std::env::var("JWT_SECRET").is_err() {
            return Err(ConfigError::MissingVar("JWT_SECRET"));
        }

        let redis_url = std::env::var("REDIS_URL").ok();
        if redis_url.is_none() {
            info!("No REDIS_URL configured, unread counts will not be cached");
        }

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidVar("PORT", raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            database_url,
            redis_url,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], port)),
            notify_on_unfollow: env_flag("NOTIFY_ON_UNFOLLOW"),
            dispatch_queue_capacity: env_capacity(
                "DISPATCH_QUEUE_CAPACITY",
                DEFAULT_DISPATCH_QUEUE_CAPACITY,
            ),
            connection_buffer_capacity: env_capacity(
                "CONNECTION_BUFFER_CAPACITY",
                DEFAULT_CONNECTION_BUFFER_CAPACITY,
            ),
        })
    }
}

fn env_flag(name: &'static str) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => false,
    }
}

fn env_capacity(name: &'static str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!("Ignoring invalid {}: {}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}
