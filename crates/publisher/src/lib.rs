//! Destination-wiki publishing for biograph.
//!
//! [`WikiPublisher`] holds an authenticated session (login handshake, CSRF
//! token, cookie jar) and writes disambiguation pages; [`listing`] persists
//! accepted groups so a failed publish phase never loses computed results.

pub mod client;
pub mod listing;

pub use client::{Credentials, WikiPublisher, WriteMode};
pub use listing::{load_listing, save_listing};
