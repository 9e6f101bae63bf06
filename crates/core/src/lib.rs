//! ICYXR Core - Shared types library.
//!
//! This crate provides the types and contracts used across all ICYXR
//! components:
//! - `storefront` - Customer-facing client (support chat, inbox, orders)
//! - `admin` - Staff console (support queue, moderation, order review)
//! - `realtime` - Adapters for the hosted realtime database
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no network I/O, no
//! database clients. Subscriptions are plain channel handles.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`store`] - The [`RealtimeStore`] contract, paths and subscription handles
//! - [`models`] - Stored records, decoded and validated at the store boundary
//! - [`ordering`] - Deterministic message order and own/other attribution
//! - [`error`] - Live-support error taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod error;
pub mod models;
pub mod ordering;
pub mod store;
pub mod types;

pub use error::SupportError;
pub use store::{Child, Query, RealtimeStore, StoreError, StorePath, Subscription};
pub use types::*;
