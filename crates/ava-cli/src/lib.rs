//! ava-cli library root.
//!
//! Exposes configuration, prompting and session persistence so integration tests
//! can exercise them without going through the command layer.

pub mod config;
pub mod prompt;
pub mod session_store;
