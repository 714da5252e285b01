//! ava-auth
//!
//! Cognito user-pool sign-in and the session that hands out identity
//! tokens for outbound API calls.

pub mod client;
pub mod error;
pub mod flows;
pub mod jwt;
pub mod session;
