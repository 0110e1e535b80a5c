//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `DOORSTEP_API_URL` - Delivery backend base URL (default: `http://localhost:3000`)
//! - `DOORSTEP_API_TOKEN` - Bearer token attached to every backend request
//! - `DOORSTEP_ORIGIN` - Origin the client runs under, used for the secure-context check
//!   (default: `http://localhost:5173`)
//! - `DOORSTEP_HTTP_TIMEOUT_SECS` - Backend request timeout (default: 30)
//! - `DOORSTEP_GEO_HIGH_ACCURACY` - Prefer high-accuracy fixes (default: true)
//! - `DOORSTEP_GEO_TIMEOUT_SECS` - Location sensor timeout (default: 30)
//! - `DOORSTEP_GEO_MAX_AGE_SECS` - Maximum age of a cached fix (default: 60)
//! - `DOORSTEP_REDIRECT_DELAY_MS` - Delay before returning home after an order (default: 2000)
//! - `DOORSTEP_DEFAULT_LAT` / `DOORSTEP_DEFAULT_LNG` - Map fallback position
//!   (default: 28.6139 / 77.2090)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (e.g. `production`)

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use doorstep_core::Coordinate;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::geolocation::PositionOptions;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Sensor timeouts below this tend to fail on a cold GPS fix.
const RECOMMENDED_MIN_GEO_TIMEOUT: Duration = Duration::from_secs(15);

/// Fallback map position when nothing better is known (New Delhi).
pub const DEFAULT_MAP_POSITION: Coordinate = Coordinate::new(28.6139, 77.2090);

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Doorstep client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Delivery backend connection settings
    pub api: ApiConfig,
    /// Origin the client is served from
    pub origin: Url,
    /// Options passed to every location acquisition
    pub geolocation: PositionOptions,
    /// Delay between a confirmed order and the redirect home
    pub redirect_delay: Duration,
    /// Position the map falls back to without a fix or user interaction
    pub default_position: Coordinate,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Delivery backend connection settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.example.com`
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Settings for an unauthenticated backend at `base_url`.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let base_url = vars.parsed("DOORSTEP_API_URL", "http://localhost:3000")?;
        let token = vars.validated_secret("DOORSTEP_API_TOKEN")?;
        let timeout = Duration::from_secs(vars.parsed("DOORSTEP_HTTP_TIMEOUT_SECS", "30")?);
        let origin = vars.parsed("DOORSTEP_ORIGIN", "http://localhost:5173")?;

        let geolocation = PositionOptions {
            enable_high_accuracy: vars.parsed("DOORSTEP_GEO_HIGH_ACCURACY", "true")?,
            timeout: Duration::from_secs(vars.parsed("DOORSTEP_GEO_TIMEOUT_SECS", "30")?),
            maximum_age: Duration::from_secs(vars.parsed("DOORSTEP_GEO_MAX_AGE_SECS", "60")?),
        };
        if geolocation.timeout < RECOMMENDED_MIN_GEO_TIMEOUT {
            tracing::warn!(
                timeout_secs = geolocation.timeout.as_secs(),
                "DOORSTEP_GEO_TIMEOUT_SECS is below 15s; cold GPS fixes may time out"
            );
        }

        let redirect_delay =
            Duration::from_millis(vars.parsed("DOORSTEP_REDIRECT_DELAY_MS", "2000")?);

        let lat: f64 = vars.parsed("DOORSTEP_DEFAULT_LAT", "28.6139")?;
        let lng: f64 = vars.parsed("DOORSTEP_DEFAULT_LNG", "77.2090")?;
        let default_position = Coordinate::try_new(lat, lng).map_err(|e| {
            ConfigError::InvalidEnvVar("DOORSTEP_DEFAULT_LAT/LNG".to_string(), e.to_string())
        })?;

        Ok(Self {
            api: ApiConfig {
                base_url,
                token,
                timeout,
            },
            origin,
            geolocation,
            redirect_delay,
            default_position,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = (self.0)(key).unwrap_or_else(|| default.to_string());
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Load an optional secret, rejecting placeholders when present.
    fn validated_secret(&self, key: &str) -> Result<Option<SecretString>, ConfigError> {
        let Some(value) = (self.0)(key).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        let secret = SecretString::from(value);
        validate_secret_strength(secret.expose_secret(), key)?;
        Ok(Some(secret))
    }
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

    #[allow(clippy::cast_precision_loss)] // Token length will never exceed f64 precision
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
