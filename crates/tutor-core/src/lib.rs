//! Tutoring client core.
//!
//! Everything here is platform-free: the browser is reached only through the
//! port traits in [`ports`], which `tutor-platform` implements.

pub mod auth;
pub mod cache;
pub mod chat;
pub mod chat_api;
pub mod client;
pub mod content;
pub mod event_bus;
pub mod library;
pub mod ports;
pub mod prefetch;

#[cfg(test)]
mod tests;
