//! Unified error handling with Sentry integration.
//!
//! Every front-end action returns `Result<T, AppError>`. Failures are shown
//! to the customer as a short transient message; store and I/O failures are
//! also captured to Sentry.

use icyxr_core::{StoreError, SupportError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::catalog::OrderError;
use crate::services::profile::ProfileError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Live-support operation failed.
    #[error("Support error: {0}")]
    Support(#[from] SupportError),

    /// Store operation failed outside a support session.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Order could not be placed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Profile could not be changed.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether this is an infrastructure failure rather than a user mistake.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Support(SupportError::StoreUnavailable(_))
                | Self::Store(_)
                | Self::Order(OrderError::Store(_))
                | Self::Profile(ProfileError::Store(_))
                | Self::Io(_)
        )
    }

    /// The transient message shown to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_server_error() {
            return "Something went wrong. Please try again.".to_string();
        }
        match self {
            Self::Support(err) => capitalize(&err.to_string()),
            Self::Order(err) => err.to_string(),
            Self::Profile(err) => err.to_string(),
            Self::Config(err) => format!("Configuration error: {err}"),
            _ => self.to_string(),
        }
    }

    /// Capture server errors to Sentry and log them.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::debug!(error = %self, "rejected action");
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this once the customer's identity is known.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}
