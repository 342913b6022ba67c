//! egui panels for the tutoring client.
//!
//! Panels never call the core directly: they render a borrowed snapshot and
//! return actions, which the app dispatches.

pub mod panels;
pub mod state;
pub mod theme;
