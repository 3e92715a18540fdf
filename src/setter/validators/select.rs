//! select: value must match (exact, else unambiguous prefix) a line from
//! one or more "select base" files.

use super::invalid;
use crate::error::ShellError;
use crate::fs::FileSystem;

pub fn read_select_bases(fs: &dyn FileSystem, bases: &[String]) -> Result<Vec<String>, ShellError> {
    let mut lines = Vec::new();
    for base in bases {
        let contents = fs.read_to_string(base)?;
        for raw in contents.lines() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            lines.push(trimmed.to_string());
        }
    }
    Ok(lines)
}

pub fn validate_select(input: &str, candidates: &[String]) -> Result<String, ShellError> {
    if let Some(exact) = candidates.iter().find(|c| c.as_str() == input) {
        return Ok(exact.clone());
    }
    let matches: Vec<&String> = candidates.iter().filter(|c| c.starts_with(input)).collect();
    match matches.len() {
        1 => Ok(matches[0].clone()),
        0 => Err(invalid(input, "no matching select value")),
        _ => Err(invalid(input, format!("ambiguous select value, candidates: {}", matches.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")))),
    }
}

/// Completion candidates: exact-else-prefix against the select base's
/// lines, collapsing to a single entry on an exact match (spec §4.5).
pub fn complete_select(input: &str, candidates: &[String]) -> Vec<String> {
    if candidates.iter().any(|c| c.as_str() == input) {
        return vec![input.to_string()];
    }
    candidates.iter().filter(|c| c.starts_with(input)).cloned().collect()
}
