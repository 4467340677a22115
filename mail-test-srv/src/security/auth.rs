//! SMTP AUTH line calculation
//!
//! The mock server does not run a credential check. Instead it precomputes
//! the exact `AUTH PLAIN <base64>` line a well-behaved client must send for
//! the configured username and password (RFC 4616), and the session compares
//! the client's line against it byte for byte.
//!
//! # Usage
//! ```
//! use mail_test_srv::security::AuthLine;
//!
//! let line = AuthLine::plain("user@example.com", "password123");
//! assert_eq!(line.as_str(), "AUTH PLAIN AHVzZXJAZXhhbXBsZS5jb20AcGFzc3dvcmQxMjM=");
//! ```

use crate::config::SmtpConfig;
use crate::error::{MailError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::fmt;
use std::sync::Arc;

/// SMTP authentication mechanisms advertised in the EHLO response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    /// PLAIN mechanism (RFC 4616)
    Plain,
    /// LOGIN mechanism, advertised only
    Login,
}

impl AuthMechanism {
    pub const ADVERTISED: [AuthMechanism; 2] = [AuthMechanism::Plain, AuthMechanism::Login];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMechanism::Plain => "PLAIN",
            AuthMechanism::Login => "LOGIN",
        }
    }

    /// Capability keyword list, e.g. `AUTH PLAIN LOGIN`
    pub fn capability() -> String {
        let names: Vec<&str> = Self::ADVERTISED.iter().map(|m| m.as_str()).collect();
        format!("AUTH {}", names.join(" "))
    }
}

/// The exact authentication line a client must send.
///
/// Computed once at startup and shared read-only by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthLine(Arc<str>);

impl AuthLine {
    /// Build `AUTH PLAIN base64("\0" username "\0" password)` with an empty authzid
    pub fn plain(username: &str, password: &str) -> Self {
        let mut credentials = Vec::with_capacity(username.len() + password.len() + 2);
        credentials.push(0);
        credentials.extend_from_slice(username.as_bytes());
        credentials.push(0);
        credentials.extend_from_slice(password.as_bytes());

        let line = format!(
            "AUTH {} {}",
            AuthMechanism::Plain.as_str(),
            BASE64.encode(credentials)
        );
        Self(line.into())
    }

    /// Resolve the configured password and build the line.
    ///
    /// Fails when the password cannot be resolved, which must abort startup.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let password = config.password.resolve()?;
        Ok(Self::plain(&config.username, &password))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, line: &str) -> bool {
        *self.0 == *line
    }
}

impl fmt::Display for AuthLine {
    /// Never prints the credentials themselves
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AUTH {} <redacted>", AuthMechanism::Plain.as_str())
    }
}

/// Extract the authentication identity from an `AUTH PLAIN <base64>` line.
///
/// Used only for diagnostics when a client's line does not match.
pub fn plain_username(line: &str) -> Result<String> {
    let encoded = line
        .strip_prefix("AUTH PLAIN ")
        .ok_or_else(|| MailError::SmtpProtocol("Not an AUTH PLAIN line".to_string()))?;

    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|e| MailError::SmtpProtocol(format!("Invalid base64: {}", e)))?;

    let parts: Vec<&[u8]> = decoded.split(|b| *b == 0).collect();
    if parts.len() != 3 {
        return Err(MailError::SmtpProtocol(
            "Invalid PLAIN auth format".to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(parts[1]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordConfig;

    #[test]
    fn test_plain_line() {
        let line = AuthLine::plain("user@example.com", "password123");
        let encoded = BASE64.encode(b"\0user@example.com\0password123");
        assert_eq!(line.as_str(), format!("AUTH PLAIN {}", encoded));
        assert!(line.matches(&format!("AUTH PLAIN {}", encoded)));
        assert!(!line.matches(&format!("AUTH PLAIN {} ", encoded)));
    }

    #[test]
    fn test_display_redacts_credentials() {
        let line = AuthLine::plain("user", "secret");
        assert_eq!(line.to_string(), "AUTH PLAIN <redacted>");
    }

    #[test]
    fn test_from_config() {
        let config = SmtpConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            username: "mailer".to_string(),
            password: PasswordConfig {
                password: Some("pw".to_string()),
                password_file: None,
            },
        };
        assert_eq!(AuthLine::from_config(&config).unwrap(), AuthLine::plain("mailer", "pw"));
    }

    #[test]
    fn test_from_config_fails_on_unreadable_password() {
        let config = SmtpConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            username: "mailer".to_string(),
            password: PasswordConfig {
                password: None,
                password_file: Some("/nonexistent/password".to_string()),
            },
        };
        assert!(AuthLine::from_config(&config).is_err());
    }

    #[test]
    fn test_plain_username() {
        let line = AuthLine::plain("someone@example.com", "pw");
        assert_eq!(plain_username(line.as_str()).unwrap(), "someone@example.com");
        assert!(plain_username("AUTH LOGIN").is_err());
        assert!(plain_username("AUTH PLAIN !!!").is_err());
    }

    #[test]
    fn test_capability() {
        assert_eq!(AuthMechanism::capability(), "AUTH PLAIN LOGIN");
    }
}
