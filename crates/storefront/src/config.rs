//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars)
//! - `ADMIN_API_TOKEN` - Bearer token for the order and settings admin API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_GEO_ENDPOINT` - Geolocation URL, `{ip}` is replaced with the
//!   client IP (default: `https://ipapi.co/{ip}/json/`)
//! - `STOREFRONT_GEO_TIMEOUT_SECS` - Seconds before detection gives up and the
//!   visitor is offered a manual choice (default: 8)
//! - `STOREFRONT_GEO_CACHE_TTL_SECS` - How long a lookup is reused per IP (default: 3600)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Bearer token guarding the admin API
    pub admin_token: SecretString,
    /// Geolocation lookup settings
    pub geolocation: GeolocationConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Where and how long to look up visitor locations.
#[derive(Debug, Clone)]
pub struct GeolocationConfig {
    /// URL template; `{ip}` is replaced with the client address.
    pub endpoint: String,
    /// Grace period before the visitor is offered a manual choice.
    pub timeout: Duration,
    /// How long a successful lookup is reused for the same IP.
    pub cache_ttl: Duration,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ipapi.co/{ip}/json/".to_string(),
            timeout: Duration::from_secs(8),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let session_secret = SecretString::from(get_required_env("STOREFRONT_SESSION_SECRET")?);
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;
        let admin_token = get_validated_secret("ADMIN_API_TOKEN")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            admin_token,
            geolocation: GeolocationConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl GeolocationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let endpoint = get_optional_env("STOREFRONT_GEO_ENDPOINT").unwrap_or(defaults.endpoint);
        url::Url::parse(&endpoint.replace("{ip}", "127.0.0.1")).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_GEO_ENDPOINT".to_string(), e.to_string())
        })?;

        let timeout: u64 = parse_env_or_default("STOREFRONT_GEO_TIMEOUT_SECS", "8")?;
        let cache_ttl: u64 = parse_env_or_default("STOREFRONT_GEO_CACHE_TTL_SECS", "3600")?;

        Ok(Self {
            endpoint,
            timeout: Duration::from_secs(timeout),
            cache_ttl: Duration::from_secs(cache_ttl),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("your-admin-token", "ADMIN_API_TOKEN").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme123", "ADMIN_API_TOKEN").is_err());
    }

    #[test]
    fn test_validate_secret_strength_rejects_low_entropy() {
        assert!(validate_secret_strength(&"a".repeat(40), "ADMIN_API_TOKEN").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "ADMIN_API_TOKEN").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_geolocation_defaults() {
        let geo = GeolocationConfig::default();
        assert_eq!(geo.timeout, Duration::from_secs(8));
        assert!(geo.endpoint.contains("{ip}"));
    }

    #[test]
    fn test_socket_addr_and_https() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/oja"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://shop.example.ng".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            admin_token: SecretString::from("token"),
            geolocation: GeolocationConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };

        assert_eq!(config.socket_addr().port(), 3000);
        assert!(config.is_https());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://user:hunter2@db/oja"),
            host: "0.0.0.0".parse().unwrap(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            session_secret: SecretString::from("session-secret-value"),
            admin_token: SecretString::from("admin-token-value"),
            geolocation: GeolocationConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("admin-token-value"));
        assert!(debug.contains("localhost:8080"));
    }
}
