//! Server configuration read from the environment.

use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

/// Runtime settings for [`crate::run_server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to listen on (`PORT`).
    pub port: u16,
    /// Deployment environment reported by the health check (`APP_ENV`).
    pub environment: String,
    /// Per-client request limits.
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 5000,
            environment: "development".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `APP_ENV`, `RATE_LIMIT_MAX_REQUESTS`, and
    /// `RATE_LIMIT_WINDOW_SECS`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            environment: std::env::var("APP_ENV").unwrap_or(defaults.environment),
            rate_limit: RateLimitConfig {
                max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.rate_limit.max_requests),
                window: parse_window(
                    std::env::var("RATE_LIMIT_WINDOW_SECS").ok().as_deref(),
                    defaults.rate_limit.window,
                ),
            },
        }
    }
}

/// Parses a rate limit window in whole seconds. Zero or unparseable values
/// fall back to `default`.
fn parse_window(value: Option<&str>, default: Duration) -> Duration {
    let Some(value) = value else {
        return default;
    };

    match value.trim().parse::<u64>() {
        Ok(0) => {
            log::warn!("RATE_LIMIT_WINDOW_SECS must be at least 1, using {default:?}");
            default
        }
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            log::warn!("Invalid RATE_LIMIT_WINDOW_SECS '{value}', using {default:?}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(900));
    }

    #[test]
    fn zero_or_garbage_window_uses_default() {
        let default = Duration::from_secs(900);

        assert_eq!(parse_window(None, default), default);
        assert_eq!(parse_window(Some("0"), default), default);
        assert_eq!(parse_window(Some("soon"), default), default);
        assert_eq!(parse_window(Some("60"), default), Duration::from_secs(60));
    }
}
