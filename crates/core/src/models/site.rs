//! Global site flags: open/closed status and the announcement banner.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{StoreError, StorePath};

/// Banner text used when no announcement has been set.
pub const DEFAULT_ANNOUNCEMENT: &str = "We are currently in Beta.";

/// Banner text shown while the store is closed.
pub const CLOSED_BANNER: &str = "The store is currently closed. No new orders can be placed.";

/// Stored shape of `siteStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatus {
    /// Whether orders are being accepted.
    pub is_active: bool,
}

impl Default for SiteStatus {
    fn default() -> Self {
        Self { is_active: true }
    }
}

impl SiteStatus {
    /// Decode `siteStatus`; a missing document means the store is open.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the document is malformed.
    pub fn from_snapshot(path: &StorePath, value: Option<Value>) -> Result<Self, StoreError> {
        value.map_or_else(
            || Ok(Self::default()),
            |value| serde_json::from_value(value).map_err(|e| StoreError::decode(path, e)),
        )
    }

    /// The opposite status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        Self {
            is_active: !self.is_active,
        }
    }
}

/// Stored shape of `announcement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Banner text.
    pub text: String,
}

impl Announcement {
    /// Decode `announcement`; missing or blank text yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the document is malformed.
    pub fn from_snapshot(path: &StorePath, value: Option<Value>) -> Result<Option<Self>, StoreError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let announcement: Self =
            serde_json::from_value(value).map_err(|e| StoreError::decode(path, e))?;
        Ok((!announcement.text.trim().is_empty()).then_some(announcement))
    }
}

/// Text for the top banner given the current flags.
#[must_use]
pub fn banner_text(status: SiteStatus, announcement: Option<&Announcement>) -> &str {
    if !status.is_active {
        return CLOSED_BANNER;
    }
    announcement.map_or(DEFAULT_ANNOUNCEMENT, |a| a.text.as_str())
}
