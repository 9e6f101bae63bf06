//! Customer live-support chat.

pub mod client;
pub mod view;

pub use client::SupportClient;
pub use view::{RecordingView, SupportView, ViewEvent};
