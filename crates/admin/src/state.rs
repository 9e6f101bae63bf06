//! Store handle and admin identity shared by the console commands.

use std::sync::Arc;

use icyxr_core::RealtimeStore;

use crate::config::AdminIdentity;
use crate::support::{ConsoleView, SupportConsole};

/// Built once at startup and passed to each command.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AdminContext<S> {
    inner: Arc<AdminContextInner<S>>,
}

struct AdminContextInner<S> {
    store: S,
    identity: AdminIdentity,
}

impl<S: RealtimeStore> AdminContext<S> {
    pub fn new(store: S, identity: AdminIdentity) -> Self {
        Self {
            inner: Arc::new(AdminContextInner { store, identity }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    #[must_use]
    pub fn identity(&self) -> &AdminIdentity {
        &self.inner.identity
    }

    /// A support console for this admin, driving `view`.
    pub fn console<V: ConsoleView>(&self, view: V) -> SupportConsole<S, V> {
        SupportConsole::new(
            self.inner.store.clone(),
            view,
            self.inner.identity.user_id.clone(),
        )
    }
}
