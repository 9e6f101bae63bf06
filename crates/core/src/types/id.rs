//! Newtype IDs for type-safe entity references.
//!
//! Every record in the realtime store is addressed by a string key, either a
//! push key generated at append time or an account ID issued by the
//! authentication service. Use the `define_id!` macro to create wrappers that
//! prevent accidentally mixing keys from different collections.

use chrono::{DateTime, Utc};

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `AsRef<str>` implementations
///
/// Ordering is lexicographic, which matches insertion order for push keys.
///
/// # Example
///
/// ```rust
/// # use icyxr_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("wd99DxqJ");
/// let order_id = OrderId::new("-NxQ2a");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string key.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying key.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying key.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(SessionId);
define_id!(MessageKey);
define_id!(NotificationKey);
define_id!(OrderId);

impl UserId {
    /// Prefix used for identifiers generated for visitors who are not signed in.
    pub const GUEST_PREFIX: &'static str = "guest-";

    /// Generate a guest identifier from the current time (`guest-<unix millis>`).
    #[must_use]
    pub fn guest(now: DateTime<Utc>) -> Self {
        Self(format!("{}{}", Self::GUEST_PREFIX, now.timestamp_millis()))
    }

    /// Whether this identifier was generated for a guest.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.0.starts_with(Self::GUEST_PREFIX)
    }
}
