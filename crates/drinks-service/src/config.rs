//! Drinks service configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default JWKS cache TTL in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for the JWKS fetch timeout.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// Upper bound for `exp`/`nbf` leeway.
pub const MAX_CLOCK_SKEW_SECONDS: u64 = 300;

/// Default database pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Drinks service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// Identity provider domain, e.g. "dev-xyz.us.auth0.com".
    pub auth_domain: String,

    /// Expected `aud` claim.
    pub api_audience: String,

    /// Expected `iss` claim, derived from the domain.
    pub jwt_issuer: String,

    /// JWKS endpoint URL.
    pub jwks_url: String,

    /// Signing algorithms accepted on inbound tokens. Always RSA.
    pub jwt_algorithms: Vec<Algorithm>,

    /// How long a fetched key set stays fresh. Zero disables caching.
    pub jwks_cache_ttl: Duration,

    /// Bound on a single JWKS fetch.
    pub jwks_fetch_timeout: Duration,

    /// Leeway applied to `exp` and `nbf`.
    pub jwt_clock_skew_seconds: u64,

    /// Database pool size.
    pub db_max_connections: u32,

    /// Empty the drinks table, restart its ids and seed it at startup.
    pub db_reset_on_start: bool,

    /// Graceful shutdown drain period.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("auth_domain", &self.auth_domain)
            .field("api_audience", &self.api_audience)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_algorithms", &self.jwt_algorithms)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_reset_on_start", &self.db_reset_on_start)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth_domain = required(vars, "AUTH0_DOMAIN")?
            .trim_end_matches('/')
            .to_string();
        let api_audience = required(vars, "API_AUDIENCE")?;

        let jwt_issuer = format!("https://{}/", auth_domain);

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| format!("https://{}/.well-known/jwks.json", auth_domain));

        let jwt_algorithms = match vars.get("JWT_ALGORITHMS") {
            Some(value) => parse_algorithms(value)?,
            None => vec![Algorithm::RS256],
        };

        let jwks_cache_ttl = Duration::from_secs(parse_u64(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
        )?);

        let jwks_fetch_timeout_seconds = parse_u64(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
        )?;
        if jwks_fetch_timeout_seconds == 0
            || jwks_fetch_timeout_seconds > MAX_JWKS_FETCH_TIMEOUT_SECONDS
        {
            return Err(ConfigError::InvalidValue {
                name: "JWKS_FETCH_TIMEOUT_SECONDS".to_string(),
                reason: format!(
                    "must be between 1 and {} seconds, got {}",
                    MAX_JWKS_FETCH_TIMEOUT_SECONDS, jwks_fetch_timeout_seconds
                ),
            });
        }

        let jwt_clock_skew_seconds = parse_u64(vars, "JWT_CLOCK_SKEW_SECONDS", 0)?;
        if jwt_clock_skew_seconds > MAX_CLOCK_SKEW_SECONDS {
            return Err(ConfigError::InvalidValue {
                name: "JWT_CLOCK_SKEW_SECONDS".to_string(),
                reason: format!(
                    "must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW_SECONDS, jwt_clock_skew_seconds
                ),
            });
        }

        let db_max_connections = match vars.get("DB_MAX_CONNECTIONS") {
            Some(value_str) => {
                let value: u32 = value_str.parse().map_err(|e| ConfigError::InvalidValue {
                    name: "DB_MAX_CONNECTIONS".to_string(),
                    reason: format!("must be a valid positive integer, got '{}': {}", value_str, e),
                })?;
                if value == 0 {
                    return Err(ConfigError::InvalidValue {
                        name: "DB_MAX_CONNECTIONS".to_string(),
                        reason: "must be greater than 0".to_string(),
                    });
                }
                value
            }
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let db_reset_on_start = parse_bool(vars, "DB_RESET_ON_START")?;
        let drain_seconds = parse_u64(vars, "DRAIN_SECONDS", 0)?;

        Ok(Config {
            database_url,
            bind_address,
            auth_domain,
            api_audience,
            jwt_issuer,
            jwks_url,
            jwt_algorithms,
            jwks_cache_ttl,
            jwks_fetch_timeout: Duration::from_secs(jwks_fetch_timeout_seconds),
            jwt_clock_skew_seconds,
            db_max_connections,
            db_reset_on_start,
            drain_seconds,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(vars: &HashMap<String, String>, name: &str, default: u64) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.parse().map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be a valid non-negative integer, got '{}': {}", value_str, e),
        }),
        None => Ok(default),
    }
}

fn parse_bool(vars: &HashMap<String, String>, name: &str) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no") => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be true or false, got '{}'", v),
        }),
    }
}

/// Parse the comma-separated allow-list. Only RSA PKCS#1 v1.5 variants are
/// accepted; anything else (including "none" and HMAC) is a startup error.
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = match name {
            "RS256" => Algorithm::RS256,
            "RS384" => Algorithm::RS384,
            "RS512" => Algorithm::RS512,
            other => {
                return Err(ConfigError::InvalidAlgorithms(format!(
                    "only RS256, RS384 and RS512 are supported, got '{}'",
                    other
                )))
            }
        };
        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "JWT_ALGORITHMS must name at least one algorithm".to_string(),
        ));
    }

    Ok(algorithms)
}
