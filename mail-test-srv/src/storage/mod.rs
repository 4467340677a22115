//! Email storage module
//!
//! - [`memory`]: in-memory store of received messages, shared by the SMTP
//!   sessions and the HTTP API

pub mod memory;

pub use memory::{CountFilter, MailStore, ReceivedMessage};
