use crate::error::{MailError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub smtp: SmtpConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Domain announced in the `220` banner
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub listen_addr: String,
    /// Username the client must authenticate as
    pub username: String,
    #[serde(flatten)]
    pub password: PasswordConfig,
}

/// Where the SMTP password comes from.
///
/// `password_file` wins over `password` when both are set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub password: Option<String>,
    pub password_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            domain: "smtp.example.com".to_string(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9380".to_string(),
            username: "cert-master@example.com".to_string(),
            password: PasswordConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9381".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl PasswordConfig {
    /// Resolve the plaintext password.
    ///
    /// A password file has its trailing newlines stripped, so files written
    /// with `echo` work as expected.
    pub fn resolve(&self) -> Result<String> {
        if let Some(path) = &self.password_file {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                MailError::Config(format!("Failed to read password file {}: {}", path, e))
            })?;
            return Ok(contents.trim_end_matches('\n').to_string());
        }

        Ok(self.password.clone().unwrap_or_default())
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MailError::Config(e.to_string()))?;

        let config: Self =
            toml::from_str(&content).map_err(|e| MailError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.domain.is_empty() {
            return Err(MailError::Config("server.domain must not be empty".to_string()));
        }
        if self.smtp.listen_addr.is_empty() {
            return Err(MailError::Config("smtp.listen_addr must not be empty".to_string()));
        }
        if self.api.listen_addr.is_empty() {
            return Err(MailError::Config("api.listen_addr must not be empty".to_string()));
        }
        Ok(())
    }

    /// Replace the port of the API listen address, keeping its host.
    pub fn set_api_port(&mut self, port: u16) {
        let host = self
            .api
            .listen_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.api.listen_addr = format!("{}:{}", host, port);
    }
}
