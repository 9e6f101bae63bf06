//! ICYXR Realtime - adapters for the realtime document store.
//!
//! - [`RestStore`] talks to the hosted database over HTTPS and streams
//!   changes with Server-Sent Events.
//! - [`MemoryStore`] keeps the tree in process; tests and demos use it.
//! - [`RecordingStore`] wraps either one and records writes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
mod memory;
pub mod push_key;
mod recording;
mod rest;
mod tree;

pub use config::{ConfigError, RealtimeConfig};
pub use memory::MemoryStore;
pub use push_key::PushKeyGenerator;
pub use recording::{RecordedWrite, RecordingStore, WriteKind};
pub use rest::RestStore;
