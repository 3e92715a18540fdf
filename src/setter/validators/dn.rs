//! RFC4514 distinguished-name validator, driven by the DN sub-state-machine
//! from spec §4.5: `DN_START -> RDN_START -> AT_START -> {DESCR|NUMERICOID}
//! -> V_START -> {HEX|STRING}` with backslash-escape handling inside string
//! values.

use super::invalid;
use crate::error::ShellError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    DnStart,
    AttrType,
    ExpectEquals,
    ValueStart,
    HexValue,
    StringValue,
    Escape,
    EscapeHexSecond,
    AfterValue,
}

pub fn validate_dn(input: &str) -> Result<String, ShellError> {
    if input.is_empty() {
        return Err(invalid(input, "DN cannot be empty"));
    }

    let mut state = State::DnStart;
    let mut trailing_unescaped_space = false;
    let mut saw_any_attr_char = false;

    for c in input.chars() {
        trailing_unescaped_space = false;
        match state {
            State::DnStart | State::AfterValue => {
                if c.is_ascii_alphabetic() || c.is_ascii_digit() {
                    state = State::AttrType;
                    saw_any_attr_char = true;
                } else {
                    return Err(invalid(input, format!("unexpected '{c}' at start of RDN")));
                }
            }
            State::AttrType => {
                if c == '=' {
                    state = State::ValueStart;
                } else if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    // still inside an attribute type/OID
                } else {
                    return Err(invalid(input, format!("unexpected '{c}' in attribute type")));
                }
            }
            State::ExpectEquals => {
                if c == '=' {
                    state = State::ValueStart;
                } else {
                    return Err(invalid(input, "expected '=' after attribute type"));
                }
            }
            State::ValueStart => {
                if c == '#' {
                    state = State::HexValue;
                } else if c == '\\' {
                    state = State::Escape;
                } else {
                    state = State::StringValue;
                    if c == ' ' {
                        trailing_unescaped_space = true;
                    }
                }
            }
            State::HexValue => {
                if !c.is_ascii_hexdigit() {
                    if c == ',' || c == ';' || c == '+' {
                        state = State::DnStart;
                    } else {
                        return Err(invalid(input, format!("'{c}' is not a hex digit in #-encoded value")));
                    }
                }
            }
            State::StringValue => {
                if c == '\\' {
                    state = State::Escape;
                } else if c == ',' || c == ';' || c == '+' {
                    state = State::DnStart;
                } else if c == ' ' {
                    trailing_unescaped_space = true;
                }
            }
            State::Escape => {
                if c.is_ascii_hexdigit() {
                    state = State::EscapeHexSecond;
                } else if matches!(c, ' ' | '"' | '#' | '+' | ',' | ';' | '<' | '=' | '>' | '\\') {
                    state = State::StringValue;
                } else {
                    return Err(invalid(input, format!("invalid escape target '{c}'")));
                }
            }
            State::EscapeHexSecond => {
                if c.is_ascii_hexdigit() {
                    state = State::StringValue;
                } else {
                    return Err(invalid(input, "expected second hex digit of escape"));
                }
            }
        }
    }

    match state {
        State::StringValue | State::HexValue => {
            if trailing_unescaped_space {
                return Err(invalid(input, "DN value ends with a trailing unescaped space"));
            }
        }
        State::Escape | State::EscapeHexSecond => {
            return Err(invalid(input, "DN ends mid-escape"));
        }
        State::AttrType | State::ExpectEquals | State::ValueStart | State::DnStart if saw_any_attr_char => {
            return Err(invalid(input, "attribute type lacks a value"));
        }
        _ => {}
    }

    Ok(input.to_string())
}

/// A distinguished name has no enumerable domain; completion never
/// guesses one (spec §4.5).
pub fn complete_dn(_input: &str) -> Vec<String> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_rdn() {
        assert_eq!(validate_dn("cn=Jim Smith").unwrap(), "cn=Jim Smith");
    }

    #[test]
    fn accepts_multi_rdn_chain() {
        assert_eq!(validate_dn("cn=Jim,ou=People,dc=example,dc=com").unwrap(), "cn=Jim,ou=People,dc=example,dc=com");
    }

    #[test]
    fn rejects_attribute_type_without_value() {
        assert!(validate_dn("cn").is_err());
    }

    #[test]
    fn rejects_trailing_unescaped_space() {
        assert!(validate_dn("cn=Jim ").is_err());
    }

    #[test]
    fn accepts_escaped_trailing_space() {
        assert_eq!(validate_dn(r"cn=Jim\ ").unwrap(), r"cn=Jim\ ");
    }

    #[test]
    fn rejects_dangling_escape() {
        assert!(validate_dn(r"cn=Jim\").is_err());
    }

    #[test]
    fn accepts_hash_encoded_value() {
        assert_eq!(validate_dn("cn=#0a0b0c").unwrap(), "cn=#0a0b0c");
    }
}
