//! HTTP API for inspecting the mail store
//!
//! - `POST /clear`: empty the store
//! - `GET /count?from=&to=`: count stored messages, optionally filtered

pub mod handlers;
pub mod server;

pub use server::{router, ApiServer};
