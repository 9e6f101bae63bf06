//! Unified error handling for admin.

use icyxr_core::{StoreError, SupportError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::moderation::ModerationError;
use crate::services::orders::OrderDecisionError;
use crate::services::site::SiteError;

/// Application-level error type for the admin console.
#[derive(Debug, Error)]
pub enum AppError {
    /// Live-support operation failed.
    #[error("Support error: {0}")]
    Support(#[from] SupportError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Ban or promotion rejected.
    #[error("Moderation error: {0}")]
    Moderation(#[from] ModerationError),

    /// Order could not be decided.
    #[error("Order error: {0}")]
    Order(#[from] OrderDecisionError),

    /// Site flag could not be changed.
    #[error("Site error: {0}")]
    Site(#[from] SiteError),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad input on the command line.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this is an infrastructure failure rather than an admin mistake.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Support(SupportError::StoreUnavailable(_))
                | Self::Store(_)
                | Self::Moderation(ModerationError::Store(_))
                | Self::Order(OrderDecisionError::Store(_))
                | Self::Site(SiteError::Store(_))
                | Self::Io(_)
        )
    }

    /// The transient message shown in the console.
    ///
    /// Internal details are not shown for infrastructure failures.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_server_error() {
            return "Internal error. Please try again.".to_string();
        }
        match self {
            Self::Support(err) => err.to_string(),
            Self::Moderation(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Site(err) => err.to_string(),
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
                "Admin console error"
            );
        } else {
            tracing::debug!(error = %self, "rejected admin action");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the admin's account ID.
pub fn set_sentry_user(admin_user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            ..Default::default()
        }));
    });
}
