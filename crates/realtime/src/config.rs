//! Connection settings for the hosted realtime database.
//!
//! # Environment Variables
//!
//! ## Required
//! - `REALTIME_DATABASE_URL` - Database base URL (e.g., `https://icyxr-default-rtdb.firebaseio.com`)
//!
//! ## Optional
//! - `REALTIME_AUTH_TOKEN` - Auth token appended to every request
//! - `REALTIME_TIMEOUT_SECS` - Timeout for one-shot requests (default: 30)

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: &str = "30";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Whole values that are left-over placeholders (case-insensitive).
///
/// Issued tokens are random, so only complete values are matched: a real
/// token can contain any of these as a substring.
const PLACEHOLDER_VALUES: &[&str] = &[
    "changeme",
    "change-me",
    "replace-me",
    "placeholder",
    "todo",
    "token",
    "secret",
];

/// Prefixes of placeholder values such as `your-token-here` or `<token>`.
const PLACEHOLDER_PREFIXES: &[&str] = &["your-", "your_", "put-your", "insert-", "<"];

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

/// Realtime database connection configuration.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// Database base URL
    pub database_url: Url,
    /// Auth token, if the database rules require one
    pub auth_token: Option<SecretString>,
    /// Timeout for one-shot reads and writes; streams are not bounded
    pub timeout: Duration,
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("database_url", &self.database_url.as_str())
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RealtimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Callers are expected to have loaded `.env` already.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is missing or malformed, the timeout
    /// is not a number, or the token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("REALTIME_DATABASE_URL")?;
        let database_url = parse_database_url(&raw_url)?;

        let auth_token = match get_optional_env("REALTIME_AUTH_TOKEN") {
            Some(token) => {
                validate_secret_strength(&token, "REALTIME_AUTH_TOKEN")?;
                Some(SecretString::from(token))
            }
            None => None,
        };

        let timeout = get_env_or_default("REALTIME_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("REALTIME_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            auth_token,
            timeout,
        })
    }

    /// Configuration for a database at `url` with no token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `url` is not an http(s) URL.
    pub fn for_url(url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: parse_database_url(url)?,
            auth_token: None,
            timeout: Duration::from_secs(30),
        })
    }
}

fn parse_database_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidEnvVar("REALTIME_DATABASE_URL".to_string(), e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "REALTIME_DATABASE_URL".to_string(),
            format!("expected an http(s) base URL, got {raw}"),
        ));
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if the variable is unset.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
#[must_use]
pub fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
#[must_use]
pub fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
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

    #[allow(clippy::cast_precision_loss)] // Token length never approaches f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn looks_like_placeholder(secret: &str) -> bool {
    let lower = secret.trim().to_lowercase();
    PLACEHOLDER_VALUES.contains(&lower.as_str())
        || PLACEHOLDER_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
        || lower.chars().all(|c| c == 'x')
}

/// Reject placeholder tokens and tokens with too little entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if looks_like_placeholder(secret) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "appears to be a placeholder".to_string(),
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
