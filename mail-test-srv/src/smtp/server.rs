use crate::error::Result;
use crate::security::AuthLine;
use crate::smtp::session::SmtpSession;
use crate::storage::MailStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Accepts SMTP connections and runs one session task per connection
pub struct SmtpServer {
    listener: TcpListener,
    hostname: String,
    auth_line: AuthLine,
    storage: Arc<MailStore>,
}

impl SmtpServer {
    /// Bind the listener. Failing here aborts startup.
    pub async fn bind(
        addr: &str,
        hostname: String,
        auth_line: AuthLine,
        storage: Arc<MailStore>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("SMTP server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            hostname,
            auth_line,
            storage,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever. Returns only when `accept` fails.
    pub async fn run(self) -> Result<()> {
        loop {
            let (socket, addr) = self.listener.accept().await?;

            let session = SmtpSession::new(
                self.hostname.clone(),
                self.auth_line.clone(),
                Arc::clone(&self.storage),
            );

            tokio::spawn(async move {
                if let Err(e) = session.handle(socket).await {
                    warn!("Session with {} ended: {}", addr, e);
                }
            });
        }
    }
}
