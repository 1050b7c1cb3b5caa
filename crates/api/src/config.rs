//! API server settings, read once from the environment at startup.
//!
//! | Var                       | Default                 |
//! |---------------------------|-------------------------|
//! | `HOST` / `PORT`           | `0.0.0.0` / `3000`      |
//! | `CORS_ORIGINS`            | `http://localhost:5173` |
//! | `REQUEST_TIMEOUT_SECS`    | `30`                    |
//! | `LOG_FORMAT`              | `pretty` (or `json`)    |
//! | `JWT_SECRET`              | required                |
//! | `JWT_ACCESS_EXPIRY_MINS`  | `15`                    |
//! | `JWT_REFRESH_EXPIRY_DAYS` | `7`                     |

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Requests running longer are answered with 408.
    pub request_timeout_secs: u64,
    pub log_json: bool,
    pub jwt: JwtConfig,
}

/// Signing secret and token lifetimes.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = required("JWT_SECRET")?;

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_or("PORT", 3000)?,
            cors_origins: split_list(&var_or("CORS_ORIGINS", "http://localhost:5173")),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30)?,
            log_json: var_or("LOG_FORMAT", "pretty").eq_ignore_ascii_case("json"),
            jwt: JwtConfig {
                secret,
                access_token_expiry_mins: parse_or("JWT_ACCESS_EXPIRY_MINS", 15)?,
                refresh_token_expiry_days: parse_or("JWT_REFRESH_EXPIRY_DAYS", 7)?,
            },
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::Invalid {
            key: "HOST",
            value: self.host.clone(),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Comma-separated list, blanks dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn config_with_host(host: &str) -> ServerConfig {
        ServerConfig {
            host: host.to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            request_timeout_secs: 30,
            log_json: false,
            jwt: JwtConfig {
                secret: "s".into(),
                access_token_expiry_mins: 15,
                refresh_token_expiry_days: 7,
            },
        }
    }

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            split_list(" http://a.test ,, http://b.test,"),
            ["http://a.test", "http://b.test"]
        );
    }

    #[test]
    fn bind_addr_accepts_ipv4_and_ipv6() {
        assert_eq!(config_with_host("127.0.0.1").bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config_with_host("::1").bind_addr().unwrap().to_string(), "[::1]:8080");
    }

    #[test]
    fn hostname_is_not_a_bind_addr() {
        let err = config_with_host("localhost").bind_addr().unwrap_err();
        assert_matches!(err, ConfigError::Invalid { key: "HOST", .. });
    }

    #[test]
    fn unset_number_falls_back_to_default() {
        let value: u64 = parse_or("KUBLADE_TEST_UNSET_NUMBER", 42).unwrap();
        assert_eq!(value, 42);
    }
}
