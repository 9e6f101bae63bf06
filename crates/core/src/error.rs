//! Errors shared by the customer client and the admin console.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::{SessionId, SessionStatus};

/// Errors raised by live-support operations.
///
/// Validation failures (`EmptyMessage`) are raised before anything reaches
/// the store. Nothing here is retried automatically; callers turn the error
/// into a transient message for the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupportError {
    /// The message text is empty after trimming.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// There is no live session to send into, or it has ended.
    #[error("no active support session")]
    NoActiveSession,

    /// The session was claimed by someone else or is otherwise not waiting.
    #[error("this chat is no longer available")]
    SessionNoLongerAvailable,

    /// The session record no longer exists.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The requested status change would skip or reverse the lifecycle.
    #[error("cannot move session from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: SessionStatus,
        /// Requested status.
        to: SessionStatus,
    },

    /// The store failed; surfaced to the user as a transient message.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}
