//! ava-api
//!
//! Authenticated client for the knowledge-base chat API, and the
//! submit-then-poll flow that turns an asynchronous chat job into a
//! single awaited answer.

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod poll;

pub use chat::ask;
pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::ApiError;
pub use poll::PollPolicy;
