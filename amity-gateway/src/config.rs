//! Gateway Configuration
//!
//! All settings come from `AMITY_*` environment variables with sensible
//! defaults for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// WebSocket listen address.
    pub listen_addr: SocketAddr,
    /// HTTP (health/metrics) listen address.
    pub http_addr: SocketAddr,
    /// SQLite database path.
    pub database_path: PathBuf,
    /// Maximum inbound events per user per minute.
    pub rate_limit_per_min: u32,
    /// Maximum inbound text frame size in bytes.
    pub max_frame_bytes: usize,
    /// Typing indicator time-to-live in milliseconds.
    pub typing_ttl_ms: u64,
    /// Interval between stale-typing sweeps in milliseconds.
    pub typing_sweep_ms: u64,
    /// Messages replayed per room when a client connects.
    pub history_limit: usize,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl GatewayConfig {
    /// Loads configuration from the environment.
    pub fn from_env() -> Self {
        GatewayConfig {
            listen_addr: env_or("AMITY_LISTEN_ADDR", "0.0.0.0:8080".parse().unwrap()),
            http_addr: env_or("AMITY_HTTP_ADDR", "0.0.0.0:8081".parse().unwrap()),
            database_path: env_or("AMITY_DB_PATH", PathBuf::from("amity.db")),
            rate_limit_per_min: env_or("AMITY_RATE_LIMIT_PER_MIN", 120),
            max_frame_bytes: env_or("AMITY_MAX_FRAME_BYTES", 64 * 1024),
            typing_ttl_ms: env_or("AMITY_TYPING_TTL_MS", 3000),
            typing_sweep_ms: env_or("AMITY_TYPING_SWEEP_MS", 1000),
            history_limit: env_or("AMITY_HISTORY_LIMIT", 50),
        }
    }

    pub fn typing_ttl(&self) -> Duration {
        Duration::from_millis(self.typing_ttl_ms)
    }

    pub fn typing_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.typing_sweep_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_env();
        assert_eq!(config.typing_ttl(), Duration::from_millis(config.typing_ttl_ms));
        assert!(config.rate_limit_per_min > 0);
        assert!(config.max_frame_bytes > 0);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("AMITY_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or::<u32>("AMITY_TEST_GARBAGE", 7), 7);
        std::env::remove_var("AMITY_TEST_GARBAGE");
    }
}
