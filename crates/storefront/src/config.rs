//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `REALTIME_DATABASE_URL` - Realtime database base URL
//!
//! ## Optional
//! - `REALTIME_AUTH_TOKEN` - Database auth token
//! - `REALTIME_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `STOREFRONT_USER_ID` - Signed-in account ID (guest when unset)
//! - `STOREFRONT_USER_EMAIL` - Signed-in account email
//! - `STOREFRONT_DISPLAY_NAME` - Name shown in support chats
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use chrono::Utc;
use icyxr_core::{Email, UserId};
use icyxr_realtime::RealtimeConfig;
use icyxr_realtime::config::get_optional_env;
use thiserror::Error;

use crate::state::Customer;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Realtime(#[from] icyxr_realtime::ConfigError),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Realtime database connection
    pub realtime: RealtimeConfig,
    /// Who is signed in, if anyone
    pub identity: CustomerIdentity,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., production, staging)
    pub sentry_environment: Option<String>,
}

/// Signed-in account details. Delegated auth hands these over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerIdentity {
    pub user_id: Option<UserId>,
    pub email: Option<Email>,
    pub display_name: Option<String>,
}

impl CustomerIdentity {
    /// The customer these details describe, or a fresh guest.
    #[must_use]
    pub fn customer(&self) -> Customer {
        self.user_id.as_ref().map_or_else(
            || Customer::guest(Utc::now()),
            |id| Customer::signed_in(id.clone(), self.email.clone(), self.display_name.clone()),
        )
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let realtime = RealtimeConfig::from_env()?;
        let identity = CustomerIdentity::from_env()?;

        Ok(Self {
            realtime,
            identity,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl CustomerIdentity {
    fn from_env() -> Result<Self, ConfigError> {
        let email = get_optional_env("STOREFRONT_USER_EMAIL")
            .map(|raw| {
                Email::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("STOREFRONT_USER_EMAIL".to_string(), e.to_string())
                })
            })
            .transpose()?;
        let user_id = get_optional_env("STOREFRONT_USER_ID").map(UserId::new);

        if user_id.is_none() && email.is_some() {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_USER_EMAIL".to_string(),
                "requires STOREFRONT_USER_ID".to_string(),
            ));
        }

        Ok(Self {
            user_id,
            email,
            display_name: get_optional_env("STOREFRONT_DISPLAY_NAME"),
        })
    }
}
