//! Storefront services built on the realtime store.

pub mod catalog;
pub mod inbox;
pub mod profile;
pub mod site;
