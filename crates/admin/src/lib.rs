//! ICYXR Admin library.
//!
//! Staff-side pieces of the store: the live-support console (waiting list,
//! claiming, chatting, ending), moderation, order review and site flags.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod support;
pub mod terminal;
