//! mail-test-srv: mock SMTP submission server for tests
//!
//! Accepts SMTP connections, walks each client through a fixed
//! greeting/authentication script, records every delivered message in
//! memory and exposes that record over a small HTTP API so a test harness
//! can assert on what was sent.
//!
//! # Example
//!
//! ```no_run
//! use mail_test_srv::api::ApiServer;
//! use mail_test_srv::config::Config;
//! use mail_test_srv::security::AuthLine;
//! use mail_test_srv::smtp::SmtpServer;
//! use mail_test_srv::storage::MailStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let auth_line = AuthLine::from_config(&config.smtp)?;
//!     let storage = Arc::new(MailStore::new());
//!
//!     let api = ApiServer::bind(&config.api.listen_addr, storage.clone()).await?;
//!     tokio::spawn(api.run());
//!
//!     let server = SmtpServer::bind(
//!         &config.smtp.listen_addr,
//!         config.server.domain.clone(),
//!         auth_line,
//!         storage,
//!     )
//!     .await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`api`]: HTTP count/clear endpoints
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`security`]: Precomputed AUTH PLAIN line
//! - [`smtp`]: SMTP protocol implementation
//! - [`storage`]: In-memory mail store
//! - [`utils`]: Address validation

pub mod api;
pub mod config;
pub mod error;
pub mod security;
pub mod smtp;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{MailError, Result};
