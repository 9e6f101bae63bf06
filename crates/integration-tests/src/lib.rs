//! Scenario tests for ICYXR live support.
//!
//! The customer client and the admin console run side by side against one
//! in-memory store, exactly as the two binaries would against the hosted
//! database.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p icyxr-integration-tests
//! ```

use std::time::Duration;

use icyxr_admin::support::{RecordingConsoleView, SupportConsole};
use icyxr_core::{RealtimeStore, SessionId, SupportError, UserId};
use icyxr_storefront::support::{RecordingView, SupportClient};

/// How long to wait for a delivery before deciding nothing more is queued.
const SETTLE: Duration = Duration::from_millis(50);

/// Account ID the test admin acts as.
pub const ADMIN_ID: &str = "admin-1";

/// A customer client and an admin console sharing one store.
pub struct Harness<S> {
    pub store: S,
    pub customer: SupportClient<S, RecordingView>,
    pub admin: SupportConsole<S, RecordingConsoleView>,
}

impl<S: RealtimeStore> Harness<S> {
    /// Fresh client and console over `store`.
    pub fn new(store: S) -> Self {
        Self {
            customer: SupportClient::new(store.clone(), RecordingView::new()),
            admin: SupportConsole::new(store.clone(), RecordingConsoleView::new(), UserId::new(ADMIN_ID)),
            store,
        }
    }

    /// The customer opens the panel and asks for a person.
    ///
    /// # Errors
    ///
    /// Returns whatever `request_session` returns.
    pub async fn request(&mut self, contact: &str) -> Result<SessionId, SupportError> {
        self.customer.open();
        let id = self
            .customer
            .request_session(UserId::new("u1"), "Brooke", contact)
            .await?;
        self.settle().await?;
        Ok(id)
    }

    /// The admin claims `id` and both sides catch up.
    ///
    /// # Errors
    ///
    /// Returns whatever `accept_session` or the updates return.
    pub async fn accept(&mut self, id: &SessionId) -> Result<(), SupportError> {
        self.admin.accept_session(id).await?;
        self.settle().await
    }

    /// Apply every delivery already queued on both sides.
    ///
    /// # Errors
    ///
    /// Returns the first error either side reports.
    pub async fn settle(&mut self) -> Result<(), SupportError> {
        while let Ok(update) = tokio::time::timeout(SETTLE, self.customer.next_update()).await {
            if !update? {
                break;
            }
        }
        while let Ok(update) = tokio::time::timeout(SETTLE, self.admin.next_update()).await {
            if !update? {
                break;
            }
        }
        Ok(())
    }
}
