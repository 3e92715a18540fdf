//! The eleven typed-value validators. Each takes the operator's raw input
//! and either returns a canonical string to persist or an
//! [`crate::error::ShellError::Invalid`]. A parallel `complete_*` function
//! renders the same domain as completion candidate lines (spec §4.5).

pub mod bytes;
pub mod dn;
pub mod hostname;
pub mod numeric;
pub mod select;
pub mod sql_id;
pub mod symlink;
pub mod user;

use crate::error::{InvalidValueError, ShellError};
use crate::fs::FileSystem;
use crate::userdb::UserDb;

/// One registered `--pair key:type[:opts]` from argument parsing.
#[derive(Debug, Clone)]
pub struct Pair {
    pub key: String,
    pub suffix: String,
    pub type_tag: ValueType,
    pub optional: bool,
    pub is_index: bool,
}

/// The eleven value domains, carrying whatever per-pair configuration each
/// needs (select/symlink base paths, bytes bounds, user group constraints).
#[derive(Debug, Clone)]
pub enum ValueType {
    Index,
    Port,
    UnprivilegedPort,
    Hostname,
    Fqdn,
    Select { bases: Vec<String> },
    Bytes { min: Option<u64>, max: Option<u64> },
    Symlink { bases: Vec<String>, required_suffix: Option<String> },
    SqlIdRegular { min: usize, max: usize },
    SqlIdDelimited { min: usize, max: usize },
    User { groups: Vec<String> },
    Rfc4514Dn,
}

fn invalid(value: &str, reason: impl Into<String>) -> ShellError {
    ShellError::from(InvalidValueError { value: value.to_string(), reason: reason.into() })
}

/// Validate `input` against `pair`'s declared type, returning the canonical
/// value to persist. `fs`/`userdb` back the domains that need filesystem or
/// user-database lookups (select/symlink bases, user existence).
pub fn validate(pair: &Pair, input: &str, fs: &dyn FileSystem, userdb: &dyn UserDb) -> Result<String, ShellError> {
    if pair.optional && input == "none" && matches!(pair.type_tag, ValueType::Select { .. } | ValueType::Symlink { .. } | ValueType::User { .. }) {
        return Ok("none".to_string());
    }
    match &pair.type_tag {
        ValueType::Index => numeric::validate_index(input),
        ValueType::Port => numeric::validate_port(input),
        ValueType::UnprivilegedPort => numeric::validate_unprivileged_port(input),
        ValueType::Hostname => hostname::validate_hostname(input),
        ValueType::Fqdn => hostname::validate_fqdn(input),
        ValueType::Select { bases } => {
            let lines = select::read_select_bases(fs, bases)?;
            select::validate_select(input, &lines)
        }
        ValueType::Bytes { min, max } => bytes::validate_bytes(input, *min, *max),
        ValueType::Symlink { bases, required_suffix } => {
            let entries = symlink::read_symlink_bases(fs, bases, required_suffix.as_deref())?;
            symlink::validate_symlink(input, &entries)
        }
        ValueType::SqlIdRegular { min, max } => sql_id::validate_regular(input, *min, *max),
        ValueType::SqlIdDelimited { min, max } => sql_id::validate_delimited(input, *min, *max),
        ValueType::User { groups } => user::validate_user(input, userdb, groups),
        ValueType::Rfc4514Dn => dn::validate_dn(input),
    }
}

/// Shell-quotes `s` for the `-`/`*`-prefixed candidate-line grammar shared
/// with `crate::discovery` (spec §4.5/§6): plain identifier-safe text is
/// emitted bare, anything else is single-quoted with embedded quotes
/// escaped as `'\''`.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/' | b':')) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// A key-discovery candidate line: `*key=` if `pair` is required, else
/// `-key=`.
fn key_candidate_line(pair: &Pair) -> String {
    let marker = if pair.optional { '-' } else { '*' };
    format!("{marker}{}=", shell_quote(&pair.key))
}

/// Value-domain completion candidates for `pair`'s type, given the
/// operator's partially-typed `partial` (spec §4.5). Candidates are bare
/// values; `complete_token` wraps them in the candidate-line grammar.
pub fn complete_value(pair: &Pair, partial: &str, fs: &dyn FileSystem, userdb: &dyn UserDb) -> Vec<String> {
    match &pair.type_tag {
        ValueType::Index => numeric::complete_numeric(partial),
        ValueType::Port => numeric::complete_numeric(partial),
        ValueType::UnprivilegedPort => numeric::complete_numeric(partial),
        ValueType::Hostname => hostname::complete_hostname(partial),
        ValueType::Fqdn => hostname::complete_fqdn(partial),
        ValueType::Select { bases } => match select::read_select_bases(fs, bases) {
            Ok(lines) => select::complete_select(partial, &lines),
            Err(_) => Vec::new(),
        },
        ValueType::Bytes { max, .. } => bytes::complete_bytes(partial, *max),
        ValueType::Symlink { bases, required_suffix } => match symlink::read_symlink_bases(fs, bases, required_suffix.as_deref()) {
            Ok(candidates) => symlink::complete_symlink(partial, &candidates),
            Err(_) => Vec::new(),
        },
        ValueType::SqlIdRegular { .. } => sql_id::complete_regular(partial),
        ValueType::SqlIdDelimited { .. } => sql_id::complete_delimited(partial),
        ValueType::User { groups } => user::complete_user(partial, userdb, groups),
        ValueType::Rfc4514Dn => dn::complete_dn(partial),
    }
}

/// Completion entry point for a single raw argv token (spec §4.5/§6): if
/// the token is `key=partial`, dispatch to that key's value-domain
/// completer and emit `-key=value` lines; otherwise list the `--pair` keys
/// whose name starts with the token as key-discovery lines.
pub fn complete_token(pairs: &[Pair], token: &str, fs: &dyn FileSystem, userdb: &dyn UserDb) -> Vec<String> {
    if let Some((key, partial)) = token.split_once('=') {
        return match pairs.iter().find(|p| p.key == key) {
            Some(pair) => complete_value(pair, partial, fs, userdb).into_iter().map(|v| format!("-{}={}", shell_quote(key), shell_quote(&v))).collect(),
            None => Vec::new(),
        };
    }
    pairs.iter().filter(|p| p.key.starts_with(token)).map(key_candidate_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::userdb::FakeUserDb;

    #[test]
    fn optional_none_short_circuits_select_and_symlink_and_user() {
        let fs = MemoryFs::new();
        let userdb = FakeUserDb::new();
        let select_pair = Pair { key: "iface".into(), suffix: String::new(), type_tag: ValueType::Select { bases: vec![] }, optional: true, is_index: false };
        assert_eq!(validate(&select_pair, "none", &fs, &userdb).unwrap(), "none");
    }

    #[test]
    fn shell_quote_leaves_plain_identifiers_bare_but_quotes_the_rest() {
        assert_eq!(shell_quote("eth0"), "eth0");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn complete_token_without_equals_lists_matching_keys_with_required_marker() {
        let pairs = vec![
            Pair { key: "name".into(), suffix: String::new(), type_tag: ValueType::Hostname, optional: false, is_index: false },
            Pair { key: "note".into(), suffix: String::new(), type_tag: ValueType::Hostname, optional: true, is_index: false },
        ];
        let fs = MemoryFs::new();
        let userdb = FakeUserDb::new();
        let mut lines = complete_token(&pairs, "n", &fs, &userdb);
        lines.sort();
        assert_eq!(lines, vec!["*name=", "-note="]);
    }

    #[test]
    fn complete_token_with_equals_dispatches_to_value_domain() {
        let pairs = vec![Pair { key: "iface".into(), suffix: String::new(), type_tag: ValueType::Select { bases: vec!["/bases/iface".to_string()] }, optional: false, is_index: false }];
        let fs = MemoryFs::new();
        fs.seed_file("/bases/iface", b"eth0\neth1\n");
        let userdb = FakeUserDb::new();
        let mut lines = complete_token(&pairs, "iface=eth", &fs, &userdb);
        lines.sort();
        assert_eq!(lines, vec!["-iface=eth0", "-iface=eth1"]);
    }

    #[test]
    fn complete_token_with_unknown_key_yields_nothing() {
        let fs = MemoryFs::new();
        let userdb = FakeUserDb::new();
        assert!(complete_token(&[], "missing=x", &fs, &userdb).is_empty());
    }
}
