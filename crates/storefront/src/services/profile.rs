//! The signed-in customer's profile: display name and ban state.

use icyxr_core::models::{UserProfile, default_username};
use icyxr_core::store::path::user;
use icyxr_core::{Email, RealtimeStore, StoreError, StorePath, Subscription, UserId};
use rand::Rng;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Errors that can occur when editing the profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the profile listener observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    /// The profile loaded with this display name.
    Loaded { name: String },
    /// No profile existed; one was created with this default name.
    Created { name: String },
    /// The stored name was blank and was replaced with this default.
    Repaired { name: String },
    /// The account is banned. The storefront should show only the reason.
    Banned { reason: String },
}

/// A fresh default display name with a random 4-digit suffix.
#[must_use]
pub fn generate_default_username(email: Option<&Email>) -> String {
    default_username(email, rand::rng().random_range(1000..=9999))
}

/// Listens to `users/{uid}` and keeps it usable.
pub struct ProfileWatcher<S> {
    store: S,
    path: StorePath,
    email: Option<Email>,
    subscription: Subscription<Option<Value>>,
}

impl<S: RealtimeStore> ProfileWatcher<S> {
    /// Attach to the profile of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the listener cannot be attached.
    pub async fn subscribe(store: S, user_id: &UserId, email: Option<Email>) -> Result<Self, StoreError> {
        let path = user(user_id)?;
        let subscription = store.subscribe_value(&path).await?;
        Ok(Self {
            store,
            path,
            email,
            subscription,
        })
    }

    /// Wait for the next profile snapshot and react to it.
    ///
    /// A missing profile is created and a blank name is repaired, both with a
    /// generated default name. Returns `None` once the listener has ended.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` for a malformed profile or a failed repair write.
    pub async fn next_event(&mut self) -> Option<Result<ProfileEvent, StoreError>> {
        let snapshot = self.subscription.next().await?;
        Some(self.apply(snapshot).await)
    }

    #[instrument(skip(self, snapshot), fields(path = %self.path))]
    async fn apply(&self, snapshot: Option<Value>) -> Result<ProfileEvent, StoreError> {
        let Some(value) = snapshot else {
            let name = generate_default_username(self.email.as_ref());
            let mut profile = json!({ "name": name });
            if let Some(email) = &self.email {
                profile["email"] = Value::from(email.as_str());
            }
            self.store.set(&self.path, profile).await?;
            info!(name = %name, "created missing profile");
            return Ok(ProfileEvent::Created { name });
        };

        let profile = UserProfile::from_value(&self.path, value)?;
        if let Some(reason) = profile.ban_reason() {
            warn!(reason, "account is banned");
            return Ok(ProfileEvent::Banned {
                reason: reason.to_owned(),
            });
        }

        if let Some(name) = profile.display_name() {
            return Ok(ProfileEvent::Loaded {
                name: name.to_owned(),
            });
        }

        let name = generate_default_username(self.email.as_ref());
        let mut fields = Map::new();
        fields.insert("name".to_owned(), Value::from(name.as_str()));
        self.store.update(&self.path, fields).await?;
        info!(name = %name, "repaired blank profile name");
        Ok(ProfileEvent::Repaired { name })
    }

    /// Stop listening.
    pub fn stop(&mut self) {
        self.subscription.stop();
    }
}

/// Change the signed-in user's display name.
///
/// # Errors
///
/// Returns `ProfileError::EmptyName` for a blank name and
/// `ProfileError::Store` if the write fails.
pub async fn rename<S: RealtimeStore>(store: &S, user_id: &UserId, name: &str) -> Result<String, ProfileError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProfileError::EmptyName);
    }
    let mut fields = Map::new();
    fields.insert("name".to_owned(), Value::from(name));
    store.update(&user(user_id)?, fields).await?;
    Ok(name.to_owned())
}
