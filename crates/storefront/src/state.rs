//! Application context shared by the storefront front ends.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use icyxr_core::models::ANONYMOUS_USER;
use icyxr_core::{Email, RealtimeStore, UserId};

use crate::services::catalog::OrderService;
use crate::support::{SupportClient, SupportView};

/// Display name used when nothing better is known.
pub const GUEST_NAME: &str = "Guest";

/// Who is using the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id: UserId,
    display_name: String,
    email: Option<Email>,
    signed_in: bool,
}

impl Customer {
    /// A visitor who is not signed in, with a generated `guest-<millis>` ID.
    #[must_use]
    pub fn guest(now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::guest(now),
            display_name: GUEST_NAME.to_owned(),
            email: None,
            signed_in: false,
        }
    }

    /// A signed-in account.
    #[must_use]
    pub fn signed_in(id: UserId, email: Option<Email>, display_name: Option<String>) -> Self {
        Self {
            id,
            display_name: display_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| GUEST_NAME.to_owned()),
            email,
            signed_in: true,
        }
    }

    /// Account ID, or the generated guest ID.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Name shown next to the customer's messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Replace the display name, e.g. once the profile has loaded.
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Email address, if signed in with one.
    #[must_use]
    pub const fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    /// Whether this is a signed-in account.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    /// Contact recorded on support sessions and orders: the email or `Guest`.
    #[must_use]
    pub fn contact(&self) -> &str {
        self.email
            .as_ref()
            .map_or(Email::GUEST_CONTACT, Email::as_str)
    }

    /// User ID recorded on orders; guests order as `anonymous`.
    #[must_use]
    pub fn order_user_id(&self) -> UserId {
        if self.signed_in {
            self.id.clone()
        } else {
            UserId::new(ANONYMOUS_USER)
        }
    }
}

/// Store handle and identity, built once at startup and passed to each
/// component.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppContext<S> {
    inner: Arc<AppContextInner<S>>,
}

struct AppContextInner<S> {
    store: S,
    customer: Customer,
}

impl<S: RealtimeStore> AppContext<S> {
    /// Create the context.
    pub fn new(store: S, customer: Customer) -> Self {
        Self {
            inner: Arc::new(AppContextInner { store, customer }),
        }
    }

    /// The realtime store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// The current customer.
    #[must_use]
    pub fn customer(&self) -> &Customer {
        &self.inner.customer
    }

    /// A support client bound to this store, driving `view`.
    pub fn support_client<V: SupportView>(&self, view: V) -> SupportClient<S, V> {
        SupportClient::new(self.inner.store.clone(), view)
    }

    /// Order placement bound to this store.
    pub fn orders(&self) -> OrderService<S> {
        OrderService::new(self.inner.store.clone())
    }
}
