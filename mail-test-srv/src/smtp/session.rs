use crate::error::{MailError, Result};
use crate::security::auth::{plain_username, AuthLine, AuthMechanism};
use crate::smtp::commands::SmtpCommand;
use crate::storage::{MailStore, ReceivedMessage};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Longest accepted line, terminator included. Longer lines end the session.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// The only greeting a client may send
const EXPECTED_GREETING: &str = "EHLO localhost";

const REPLY_OK: &[u8] = b"250 OK \r\n";
const REPLY_SYNTAX_ERROR: &[u8] = b"501 syntax error in parameters or arguments \r\n";
const REPLY_AUTH_OK: &[u8] = b"235 2.7.0 Authentication successful\r\n";
const REPLY_START_INPUT: &[u8] = b"354 Start mail input \r\n";
const REPLY_GOT_MAIL: &[u8] = b"250 Got mail \r\n";
const REPLY_BYE: &[u8] = b"221 Bye \r\n";

/// Sender, recipients and body collected between `MAIL` and the end of `DATA`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Option<String>,
    pub recipients: Vec<String>,
    pub body: String,
}

impl Transaction {
    pub fn reset(&mut self) {
        self.sender = None;
        self.recipients.clear();
        self.body.clear();
    }

    /// Append one line of message data, normalizing its terminator to CRLF
    pub fn push_body_line(&mut self, line: &str) {
        self.body.push_str(line);
        self.body.push_str("\r\n");
    }

    /// Store one record per recipient in a single batch and reset.
    /// Returns how many were stored.
    ///
    /// Recipients collected without a sender are discarded.
    pub fn commit(&mut self, storage: &MailStore) -> usize {
        let mut stored = 0;

        if let Some(sender) = &self.sender {
            let batch = self.recipients.iter().map(|recipient| {
                info!("Got mail: {} -> {}", sender, recipient);
                ReceivedMessage {
                    sender: sender.clone(),
                    recipient: recipient.clone(),
                    body: self.body.clone(),
                }
            });
            stored = storage.append_all(batch);
        } else if !self.recipients.is_empty() {
            debug!(
                "Discarding {} recipients without a sender",
                self.recipients.len()
            );
        }

        self.reset();
        stored
    }
}

/// Per-connection SMTP state machine.
///
/// Greeting and authentication are scripted: any deviation closes the
/// connection without a reply. After that, `MAIL`/`RCPT`/`DATA` transactions
/// run until `QUIT` or until the peer goes away.
pub struct SmtpSession {
    hostname: String,
    auth_line: AuthLine,
    storage: Arc<MailStore>,
    peer: String,
    transaction: Transaction,
}

impl SmtpSession {
    pub fn new(hostname: String, auth_line: AuthLine, storage: Arc<MailStore>) -> Self {
        Self {
            hostname,
            auth_line,
            storage,
            peer: "unknown".to_string(),
            transaction: Transaction::default(),
        }
    }

    /// Label used in log lines, normally the peer address
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    /// Handle an accepted TCP connection
    pub async fn handle(self, stream: TcpStream) -> Result<()> {
        let session = match stream.peer_addr() {
            Ok(addr) => self.with_peer(addr.to_string()),
            Err(_) => self,
        };
        info!(target: "audit", "New SMTP connection from {}", session.peer);

        session.run(stream).await
    }

    /// Drive the whole exchange over any bidirectional stream
    pub async fn run<S>(mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();

        reader
            .write_all(format!("220 {} ESMTP\r\n", self.hostname).as_bytes())
            .await?;
        expect_line(&mut reader, &mut buf, EXPECTED_GREETING).await?;

        reader.write_all(b"250-PIPELINING\r\n").await?;
        reader
            .write_all(format!("250-{}\r\n", AuthMechanism::capability()).as_bytes())
            .await?;
        reader.write_all(b"250 8BITMIME\r\n").await?;

        let line = read_line(&mut reader, &mut buf).await?;
        if !self.auth_line.matches(&line) {
            let user = plain_username(&line).unwrap_or_else(|_| "<unparseable>".to_string());
            return Err(MailError::SmtpProtocol(format!(
                "Expected {}, got credentials for {}",
                self.auth_line, user
            )));
        }
        reader.write_all(REPLY_AUTH_OK).await?;
        info!(target: "audit", "Successful auth from {}", self.peer);

        self.command_loop(&mut reader, &mut buf).await
    }

    async fn command_loop<S>(&mut self, reader: &mut BufReader<S>, buf: &mut Vec<u8>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let line = read_line(reader, buf).await?;
            debug!("Received: {}", line);

            match SmtpCommand::parse(&line) {
                SmtpCommand::Quit => {
                    reader.write_all(REPLY_BYE).await?;
                    return Ok(());
                }
                SmtpCommand::Rset => {
                    self.transaction.reset();
                    reader.write_all(REPLY_OK).await?;
                }
                SmtpCommand::Noop => {
                    reader.write_all(REPLY_OK).await?;
                }
                SmtpCommand::Mail(line) => {
                    self.transaction.reset();
                    match SmtpCommand::parse_mail_from(&line) {
                        Ok(sender) => {
                            self.transaction.sender = Some(sender);
                            reader.write_all(REPLY_OK).await?;
                        }
                        Err(e) => {
                            warn!("{}: MAIL FROM rejected: {}", self.peer, e);
                            reader.write_all(REPLY_SYNTAX_ERROR).await?;
                        }
                    }
                }
                SmtpCommand::Rcpt(line) => match SmtpCommand::parse_rcpt_to(&line) {
                    Ok(recipient) => {
                        self.transaction.recipients.push(recipient);
                        reader.write_all(REPLY_OK).await?;
                    }
                    Err(e) => {
                        warn!("{}: RCPT TO rejected: {}", self.peer, e);
                        reader.write_all(REPLY_SYNTAX_ERROR).await?;
                    }
                },
                SmtpCommand::Data => {
                    reader.write_all(REPLY_START_INPUT).await?;
                    self.receive_data(reader, buf).await?;
                    self.transaction.commit(&self.storage);
                    reader.write_all(REPLY_GOT_MAIL).await?;
                }
                SmtpCommand::Unknown(token) => {
                    debug!("Ignoring unrecognized command {:?}", token);
                }
            }
        }
    }

    /// Collect message lines until one that is exactly `.`
    async fn receive_data<S>(&mut self, reader: &mut BufReader<S>, buf: &mut Vec<u8>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let line = read_line(reader, buf).await?;
            if line == "." {
                debug!("End of DATA, {} bytes", self.transaction.body.len());
                return Ok(());
            }
            self.transaction.push_body_line(&line);
        }
    }
}

/// Read one line without its terminator.
///
/// Bytes that are not UTF-8 are replaced rather than failing the session.
/// A line longer than `MAX_LINE_LENGTH` is a protocol error.
async fn read_line<S>(reader: &mut BufReader<S>, buf: &mut Vec<u8>) -> Result<String>
where
    S: AsyncRead + Unpin,
{
    buf.clear();
    let n = (&mut *reader)
        .take(MAX_LINE_LENGTH as u64)
        .read_until(b'\n', buf)
        .await?;
    if n == 0 {
        return Err(MailError::Disconnected);
    }
    if n == MAX_LINE_LENGTH && buf.last() != Some(&b'\n') {
        return Err(MailError::SmtpProtocol(format!(
            "Line too long (max {} bytes)",
            MAX_LINE_LENGTH
        )));
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    Ok(String::from_utf8_lossy(buf).into_owned())
}

async fn expect_line<S>(reader: &mut BufReader<S>, buf: &mut Vec<u8>, expected: &str) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let line = read_line(reader, buf).await?;
    if line != expected {
        return Err(MailError::SmtpProtocol(format!(
            "Expected {}, got {}",
            expected, line
        )));
    }
    Ok(())
}
