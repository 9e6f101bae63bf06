//! What the admin sees while working the support queue.

use icyxr_core::models::ChatSession;
use icyxr_core::ordering::RenderedMessage;

/// Presentation surface for the admin console.
pub trait ConsoleView {
    /// Replace the waiting list.
    fn show_waiting_list(&mut self, sessions: &[ChatSession]);

    /// Switch to the chat panel for a claimed session.
    fn show_session(&mut self, session: &ChatSession);

    /// Replace the rendered conversation with `messages`.
    fn render_messages(&mut self, messages: &[RenderedMessage]);

    /// The claimed session has ended; go back to the waiting list.
    fn show_ended(&mut self);

    /// Show a transient error.
    fn show_error(&mut self, message: &str);
}

/// One call made on a [`RecordingConsoleView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    WaitingList(Vec<String>),
    Session(String),
    Messages(Vec<RenderedMessage>),
    Ended,
    Error(String),
}

/// A [`ConsoleView`] that records every call.
///
/// Waiting lists are recorded as contacts, sessions by ID.
#[derive(Debug, Clone, Default)]
pub struct RecordingConsoleView {
    events: Vec<ConsoleEvent>,
}

impl RecordingConsoleView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[ConsoleEvent] {
        &self.events
    }

    /// Texts of the most recent render.
    #[must_use]
    pub fn rendered_texts(&self) -> Vec<String> {
        self.events
            .iter()
            .rev()
            .find_map(|event| match event {
                ConsoleEvent::Messages(messages) => {
                    Some(messages.iter().map(|m| m.text.clone()).collect())
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn ended_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ConsoleEvent::Ended))
            .count()
    }
}

impl ConsoleView for RecordingConsoleView {
    fn show_waiting_list(&mut self, sessions: &[ChatSession]) {
        self.events.push(ConsoleEvent::WaitingList(
            sessions.iter().map(|s| s.customer_contact.clone()).collect(),
        ));
    }

    fn show_session(&mut self, session: &ChatSession) {
        self.events.push(ConsoleEvent::Session(session.id.to_string()));
    }

    fn render_messages(&mut self, messages: &[RenderedMessage]) {
        self.events.push(ConsoleEvent::Messages(messages.to_vec()));
    }

    fn show_ended(&mut self) {
        self.events.push(ConsoleEvent::Ended);
    }

    fn show_error(&mut self, message: &str) {
        self.events.push(ConsoleEvent::Error(message.to_owned()));
    }
}
