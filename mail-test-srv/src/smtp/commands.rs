use crate::error::{MailError, Result};
use crate::utils::parse_address;
use regex::Regex;
use std::sync::LazyLock;

static MAIL_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^MAIL FROM:<(.*)>\s*BODY=8BITMIME\s*$").expect("valid regex"));

static RCPT_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^RCPT TO:<(.*)>\s*$").expect("valid regex"));

/// Command loop dispatch, keyed on the first space-separated token.
///
/// Tokens are case-sensitive. `MAIL` and `RCPT` keep the whole line so the
/// session can decide what to reset before checking its shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SmtpCommand {
    Quit,
    Rset,
    Noop,
    Mail(String),
    Rcpt(String),
    Data,
    Unknown(String),
}

impl SmtpCommand {
    pub fn parse(line: &str) -> Self {
        let token = line.split(' ').next().unwrap_or_default();

        match token {
            "QUIT" => SmtpCommand::Quit,
            "RSET" => SmtpCommand::Rset,
            "NOOP" => SmtpCommand::Noop,
            "MAIL" => SmtpCommand::Mail(line.to_string()),
            "RCPT" => SmtpCommand::Rcpt(line.to_string()),
            "DATA" => SmtpCommand::Data,
            _ => SmtpCommand::Unknown(token.to_string()),
        }
    }

    /// Extract and validate the sender from `MAIL FROM:<addr> BODY=8BITMIME`
    pub fn parse_mail_from(line: &str) -> Result<String> {
        let captures = MAIL_FROM
            .captures(line)
            .ok_or_else(|| MailError::SmtpProtocol("Invalid MAIL FROM syntax".to_string()))?;
        parse_address(&captures[1])
    }

    /// Extract and validate the recipient from `RCPT TO:<addr>`
    pub fn parse_rcpt_to(line: &str) -> Result<String> {
        let captures = RCPT_TO
            .captures(line)
            .ok_or_else(|| MailError::SmtpProtocol("Invalid RCPT TO syntax".to_string()))?;
        parse_address(&captures[1])
    }
}
