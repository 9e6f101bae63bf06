//! Status enums for stored records.

use serde::{Deserialize, Serialize};

/// Lifecycle of a live-support chat session.
///
/// Sessions only move forward: `waiting → active → closed`. Nothing in the
/// store enforces this, so every writer checks [`SessionStatus::can_transition_to`]
/// before touching the `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Requested by a customer, not yet claimed by an admin.
    Waiting,
    /// Claimed by an admin; both sides may exchange messages.
    Active,
    /// Ended by the admin. Terminal.
    Closed,
}

impl SessionStatus {
    /// Wire representation stored in the `status` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    /// Whether no further writes are accepted for a session in this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether `self → next` is a single forward step.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::Active) | (Self::Active, Self::Closed)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("invalid session status: {s}")),
        }
    }
}

/// Review state of a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed by a customer, awaiting review.
    #[default]
    Pending,
    /// Accepted by an admin.
    Approved,
    /// Rejected by an admin.
    Denied,
}

impl OrderStatus {
    /// Wire representation stored in the `status` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
