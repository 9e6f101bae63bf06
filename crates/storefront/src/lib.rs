//! ICYXR Storefront library.
//!
//! Customer-facing pieces of the store: the live-support chat client, the
//! notification inbox, order placement, profile upkeep and the site banner.
//! The binary wires them to a terminal; tests drive them against an
//! in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod support;
pub mod terminal;
