//! Security module
//!
//! - [`auth`]: precomputed SMTP AUTH PLAIN line

pub mod auth;

pub use auth::{AuthLine, AuthMechanism};
