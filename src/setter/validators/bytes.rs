//! bytes: decimal magnitude with an optional SI/binary suffix, canonicalised
//! to the expanded byte count.

use super::invalid;
use crate::error::ShellError;

const SUFFIXES: &[(&str, u128)] = &[
    ("B", 1),
    ("kB", 1_000),
    ("KiB", 1_024),
    ("MB", 1_000_000),
    ("MiB", 1_024 * 1_024),
    ("GB", 1_000_000_000),
    ("GiB", 1_024 * 1_024 * 1_024),
    ("TB", 1_000_000_000_000),
    ("TiB", 1_024u128.pow(4)),
    ("PB", 1_000_000_000_000_000),
    ("PiB", 1_024u128.pow(5)),
    ("EB", 1_000_000_000_000_000_000),
    ("EiB", 1_024u128.pow(6)),
];

fn split_digits_and_suffix(input: &str) -> (&str, &str) {
    let digit_end = input.find(|c: char| !c.is_ascii_digit()).unwrap_or(input.len());
    (&input[..digit_end], &input[digit_end..])
}

pub fn validate_bytes(input: &str, min: Option<u64>, max: Option<u64>) -> Result<String, ShellError> {
    let (digits, suffix) = split_digits_and_suffix(input);
    if digits.is_empty() || digits.len() > 18 {
        return Err(invalid(input, "bytes value must be 1..18 decimal digits"));
    }
    let magnitude: u128 = digits.parse().map_err(|_| invalid(input, "not a decimal number"))?;

    let multiplier: u128 = if suffix.is_empty() {
        1
    } else {
        let exact: Vec<&(&str, u128)> = SUFFIXES.iter().filter(|(name, _)| *name == suffix).collect();
        if let Some((_, m)) = exact.first() {
            *m
        } else {
            let prefix_matches: Vec<&(&str, u128)> = SUFFIXES.iter().filter(|(name, _)| name.starts_with(suffix)).collect();
            match prefix_matches.len() {
                1 => prefix_matches[0].1,
                0 => return Err(invalid(input, format!("unknown byte suffix '{suffix}'"))),
                _ => {
                    let names: Vec<&str> = prefix_matches.iter().map(|(n, _)| *n).collect();
                    return Err(invalid(input, format!("ambiguous byte suffix, candidates: {}", names.join(", "))));
                }
            }
        }
    };

    let total = magnitude.checked_mul(multiplier).ok_or_else(|| invalid(input, "byte count overflows"))?;
    if let Some(min) = min {
        if total < min as u128 {
            return Err(invalid(input, format!("below minimum of {min} bytes")));
        }
    }
    if let Some(max) = max {
        if total > max as u128 {
            return Err(invalid(input, format!("above maximum of {max} bytes")));
        }
    }
    Ok(total.to_string())
}

/// Completion helper: suffixes whose expansion would overflow or exceed
/// `max` are silently omitted, per spec §4.5.
pub fn completable_suffixes(magnitude: u128, max: Option<u64>) -> Vec<&'static str> {
    SUFFIXES
        .iter()
        .filter_map(|(name, mult)| {
            let total = magnitude.checked_mul(*mult)?;
            if let Some(max) = max {
                if total > max as u128 {
                    return None;
                }
            }
            Some(*name)
        })
        .collect()
}

/// Completion candidates for a partially-typed bytes value: the digit
/// prefix is kept as-is, and the suffix portion (if any) is matched
/// exact-else-prefix against the suffixes that stay within `max` (spec
/// §4.5: suffixes whose expansion would overflow or exceed `max` are
/// silently omitted from completion).
pub fn complete_bytes(input: &str, max: Option<u64>) -> Vec<String> {
    let (digits, suffix) = split_digits_and_suffix(input);
    if digits.is_empty() {
        return Vec::new();
    }
    let magnitude: u128 = match digits.parse() {
        Ok(m) => m,
        Err(_) => return Vec::new(),
    };
    let allowed = completable_suffixes(magnitude, max);

    if suffix.is_empty() {
        return allowed.iter().map(|s| format!("{digits}{s}")).collect();
    }
    if allowed.iter().any(|s| *s == suffix) {
        return vec![format!("{digits}{suffix}")];
    }
    allowed.iter().filter(|s| s.starts_with(suffix)).map(|s| format!("{digits}{s}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_5_bytes_with_mib_suffix_no_bounds() {
        assert_eq!(validate_bytes("5MiB", None, None).unwrap(), "5242880");
    }

    #[test]
    fn scenario_5_bytes_bounded_rejects_suffix_over_max() {
        assert!(validate_bytes("5MiB", None, Some(1_000_000)).is_err());
    }

    #[test]
    fn completable_suffixes_excludes_suffixes_over_max() {
        let candidates = completable_suffixes(5, Some(1_000_000));
        assert!(candidates.contains(&"B"));
        assert!(!candidates.contains(&"MiB"));
    }

    #[test]
    fn bare_digits_default_to_one_byte_multiplier() {
        assert_eq!(validate_bytes("1024", None, None).unwrap(), "1024");
    }

    #[test]
    fn too_many_digits_is_rejected() {
        assert!(validate_bytes("1234567890123456789", None, None).is_err());
    }

    #[test]
    fn completion_lists_suffixes_within_bound_when_none_typed() {
        let candidates = complete_bytes("5", Some(10_000));
        assert!(candidates.contains(&"5B".to_string()));
        assert!(candidates.contains(&"5kB".to_string()));
        assert!(!candidates.contains(&"5MiB".to_string()));
    }

    #[test]
    fn completion_narrows_by_typed_suffix_prefix() {
        let candidates = complete_bytes("5Ki", None);
        assert_eq!(candidates, vec!["5KiB"]);
    }

    #[test]
    fn completion_is_empty_for_a_suffix_that_exceeds_max() {
        let candidates = complete_bytes("5MiB", Some(1_000_000));
        assert!(candidates.is_empty());
    }
}
