//! hostname / FQDN label grammar.

use super::invalid;
use crate::error::ShellError;

pub fn validate_hostname(input: &str) -> Result<String, ShellError> {
    validate_label(input).map(|_| input.to_string())
}

fn validate_label(label: &str) -> Result<(), ShellError> {
    if label.is_empty() || label.len() > 63 {
        return Err(invalid(label, "hostname label must be 1..63 characters"));
    }
    if label.starts_with('-') {
        return Err(invalid(label, "hostname label cannot start with '-'"));
    }
    if !label.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
        return Err(invalid(label, "hostname label must be [0-9a-z-]"));
    }
    Ok(())
}

pub fn validate_fqdn(input: &str) -> Result<String, ShellError> {
    if input.len() > 253 {
        return Err(invalid(input, "FQDN exceeds 253 characters"));
    }
    if input.starts_with('.') || input.contains("..") {
        return Err(invalid(input, "FQDN cannot have a leading or consecutive dot"));
    }
    for label in input.split('.') {
        validate_label(label)?;
    }
    Ok(input.to_string())
}

/// Hostname/FQDN values are free-form label text with no enumerable
/// domain; completion never guesses a name (spec §4.5).
pub fn complete_hostname(_input: &str) -> Vec<String> {
    Vec::new()
}

pub fn complete_fqdn(_input: &str) -> Vec<String> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_leading_hyphen() {
        assert!(validate_hostname("-bad").is_err());
    }

    #[test]
    fn accepts_plain_hostname() {
        assert_eq!(validate_hostname("router-1").unwrap(), "router-1");
    }

    #[test]
    fn fqdn_rejects_consecutive_dots() {
        assert!(validate_fqdn("a..b").is_err());
    }

    #[test]
    fn fqdn_accepts_multi_label_name() {
        assert_eq!(validate_fqdn("host.example.com").unwrap(), "host.example.com");
    }
}
