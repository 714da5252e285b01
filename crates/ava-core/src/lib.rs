//! ava-core
//!
//! Pure request/response records for the knowledge-base chat service.
//! No network or AWS dependency — this is the shared vocabulary of the
//! Ava client crates.

pub mod error;
pub mod models;
