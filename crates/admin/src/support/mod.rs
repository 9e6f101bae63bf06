//! Admin side of live support.

pub mod console;
pub mod view;

pub use console::{SupportConsole, WaitingSessions};
pub use view::{ConsoleEvent, ConsoleView, RecordingConsoleView};
