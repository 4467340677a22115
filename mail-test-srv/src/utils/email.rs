use crate::error::{MailError, Result};

/// Parse an envelope address and return the bare `local@domain` form.
///
/// Accepts either a plain addr-spec or a `Display Name <local@domain>` form.
/// The local part is a dot-atom or a quoted string, the domain a dot-atom or
/// a `[...]` literal. Single-label domains such as `localhost` are allowed.
pub fn parse_address(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MailError::InvalidEmail("Email is empty".to_string()));
    }

    let addr_spec = match (input.rfind('<'), input.strip_suffix('>')) {
        (Some(open), Some(inner)) => inner[open + 1..].trim(),
        (None, None) => input,
        _ => {
            return Err(MailError::InvalidEmail(format!(
                "Unbalanced angle brackets in {}",
                input
            )))
        }
    };

    let (local, domain) = addr_spec.rsplit_once('@').ok_or_else(|| {
        MailError::InvalidEmail(format!("Email must contain @: {}", addr_spec))
    })?;

    if local.is_empty() || domain.is_empty() {
        return Err(MailError::InvalidEmail(
            "Email parts cannot be empty".to_string(),
        ));
    }

    validate_local_part(local)?;
    validate_domain(domain)?;

    Ok(addr_spec.to_string())
}

fn validate_local_part(local: &str) -> Result<()> {
    if let Some(quoted) = local.strip_prefix('"') {
        let inner = quoted.strip_suffix('"').ok_or_else(|| {
            MailError::InvalidEmail(format!("Unterminated quoted local part: {}", local))
        })?;
        if inner.chars().any(|c| c == '\r' || c == '\n') {
            return Err(MailError::InvalidEmail(
                "Line break in quoted local part".to_string(),
            ));
        }
        return Ok(());
    }

    validate_dot_atom(local, "local part")
}

fn validate_domain(domain: &str) -> Result<()> {
    if let Some(literal) = domain.strip_prefix('[') {
        let inner = literal.strip_suffix(']').ok_or_else(|| {
            MailError::InvalidEmail(format!("Unterminated domain literal: {}", domain))
        })?;
        if inner.is_empty() || inner.chars().any(|c| matches!(c, '[' | ']' | '\\') || c.is_whitespace()) {
            return Err(MailError::InvalidEmail(format!(
                "Invalid domain literal: {}",
                domain
            )));
        }
        return Ok(());
    }

    validate_dot_atom(domain, "domain")
}

fn validate_dot_atom(value: &str, what: &str) -> Result<()> {
    for atom in value.split('.') {
        if atom.is_empty() {
            return Err(MailError::InvalidEmail(format!(
                "Empty label in {}: {}",
                what, value
            )));
        }
        if let Some(bad) = atom.chars().find(|c| !is_atext(*c)) {
            return Err(MailError::InvalidEmail(format!(
                "Invalid character {:?} in {}: {}",
                bad, what, value
            )));
        }
    }
    Ok(())
}

/// RFC 5322 atext, extended to non-ASCII (RFC 6532)
fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c) || !c.is_ascii()
}
