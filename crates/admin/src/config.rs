//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `REALTIME_DATABASE_URL` - Realtime database base URL
//! - `ADMIN_USER_ID` - Account ID of the admin using the console
//!
//! ## Optional
//! - `REALTIME_AUTH_TOKEN` - Database auth token
//! - `REALTIME_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `ADMIN_DISPLAY_NAME` - Name shown in the console (default: Admin)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use icyxr_core::UserId;
use icyxr_core::models::ADMIN_DISPLAY_NAME;
use icyxr_realtime::RealtimeConfig;
use icyxr_realtime::config::{get_env_or_default, get_optional_env, get_required_env};
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Realtime(#[from] icyxr_realtime::ConfigError),
}

/// The admin operating the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    /// Account ID; written as `adminId` on claimed sessions.
    pub user_id: UserId,
    /// Name shown in the console.
    pub display_name: String,
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Realtime database connection
    pub realtime: RealtimeConfig,
    /// Who is operating the console
    pub identity: AdminIdentity,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., production, staging)
    pub sentry_environment: Option<String>,
}

impl AdminConfig {
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
        let identity = AdminIdentity {
            user_id: UserId::new(get_required_env("ADMIN_USER_ID")?),
            display_name: get_env_or_default("ADMIN_DISPLAY_NAME", ADMIN_DISPLAY_NAME),
        };

        Ok(Self {
            realtime,
            identity,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}
