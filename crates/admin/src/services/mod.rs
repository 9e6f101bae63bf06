//! Admin services that act on the store outside live support.

pub mod moderation;
pub mod notify;
pub mod orders;
pub mod site;
