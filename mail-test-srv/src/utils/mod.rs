//! Utility modules
//!
//! - [`email`]: Envelope address parsing and validation

pub mod email;

pub use email::parse_address;
