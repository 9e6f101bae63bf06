//! What the customer sees while a support session runs.

use icyxr_core::ordering::RenderedMessage;

/// First bot line, shown when the support panel opens.
pub const GREETING: &str = "Hi! Welcome to ICYXR 3D Printing, how can I help?";
/// Bot offer to hand over to a person.
pub const OFFER_REPRESENTATIVE: &str =
    "Would you like to speak to a customer service representative?";
/// Bot line shown once a session has been requested.
pub const CONNECTING: &str = "Connecting you to a helper... Please wait, this may take a moment.";
/// Shown once, when an admin claims the session.
pub const CONNECTED: &str = "You are now connected with an admin.";
/// Shown when the session closes.
pub const ENDED_BY_ADMIN: &str = "The chat has been ended by the admin.";

/// Presentation surface for the customer side of a support chat.
///
/// The client drives the view; the view never talks to the store.
pub trait SupportView {
    /// Append a bot line.
    fn show_bot_message(&mut self, text: &str);

    /// Show the "waiting for admin" status.
    fn show_waiting(&mut self);

    /// Show the connected banner and enable input. Called at most once per
    /// session.
    fn show_connected(&mut self);

    /// Replace the rendered conversation with `messages`.
    fn render_messages(&mut self, messages: &[RenderedMessage]);

    /// Mark the session ended and disable input.
    fn show_ended(&mut self);

    /// Show a transient error.
    fn show_error(&mut self, message: &str);

    /// Clear everything, as when the panel is closed.
    fn reset(&mut self);
}

/// One call made on a [`RecordingView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Bot(String),
    Waiting,
    Connected,
    Messages(Vec<RenderedMessage>),
    Ended,
    Error(String),
    Reset,
}

/// A [`SupportView`] that records every call, for tests and headless use.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    events: Vec<ViewEvent>,
}

impl RecordingView {
    /// Create an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> &[ViewEvent] {
        &self.events
    }

    /// How many times the connected banner was shown.
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.count(|event| matches!(event, ViewEvent::Connected))
    }

    /// How many times the session was marked ended.
    #[must_use]
    pub fn ended_count(&self) -> usize {
        self.count(|event| matches!(event, ViewEvent::Ended))
    }

    /// Bot lines in display order.
    #[must_use]
    pub fn bot_messages(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Bot(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Texts of the most recent render.
    #[must_use]
    pub fn rendered_texts(&self) -> Vec<String> {
        self.last_render()
            .map(|messages| messages.iter().map(|m| m.text.clone()).collect())
            .unwrap_or_default()
    }

    /// The most recent render, if any.
    #[must_use]
    pub fn last_render(&self) -> Option<&[RenderedMessage]> {
        self.events.iter().rev().find_map(|event| match event {
            ViewEvent::Messages(messages) => Some(messages.as_slice()),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&ViewEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}

impl SupportView for RecordingView {
    fn show_bot_message(&mut self, text: &str) {
        self.events.push(ViewEvent::Bot(text.to_owned()));
    }

    fn show_waiting(&mut self) {
        self.events.push(ViewEvent::Waiting);
    }

    fn show_connected(&mut self) {
        self.events.push(ViewEvent::Connected);
    }

    fn render_messages(&mut self, messages: &[RenderedMessage]) {
        self.events.push(ViewEvent::Messages(messages.to_vec()));
    }

    fn show_ended(&mut self) {
        self.events.push(ViewEvent::Ended);
    }

    fn show_error(&mut self, message: &str) {
        self.events.push(ViewEvent::Error(message.to_owned()));
    }

    fn reset(&mut self) {
        self.events.push(ViewEvent::Reset);
    }
}
