//! SMTP server implementation
//!
//! - [`server`]: listener and per-connection task spawning
//! - [`session`]: SMTP session state machine
//! - [`commands`]: SMTP command parsing

pub mod commands;
pub mod server;
pub mod session;

pub use commands::SmtpCommand;
pub use server::SmtpServer;
pub use session::{SmtpSession, Transaction};
