//! symlink: value names an entry in one or more base directories
//! (optionally filtered and stripped by a required filename suffix).
//! Matching happens against the suffix-stripped entry name, but the
//! canonical value persisted (and completed) is the absolute target path
//! per spec §4.5.

use super::invalid;
use crate::error::ShellError;
use crate::fs::FileSystem;

/// One base-directory entry: the name the operator types and matches
/// against (suffix stripped), and the absolute path it resolves to.
#[derive(Debug, Clone)]
pub struct SymlinkCandidate {
    pub match_name: String,
    pub absolute_path: String,
}

pub fn read_symlink_bases(fs: &dyn FileSystem, bases: &[String], required_suffix: Option<&str>) -> Result<Vec<SymlinkCandidate>, ShellError> {
    let mut candidates = Vec::new();
    for base in bases {
        let base_trimmed = base.trim_end_matches('/');
        for entry in fs.read_dir(base)? {
            let match_name = match required_suffix {
                Some(suffix) => match entry.name.strip_suffix(suffix) {
                    Some(stripped) => stripped.to_string(),
                    None => continue,
                },
                None => entry.name.clone(),
            };
            let absolute_path = format!("{base_trimmed}/{}", entry.name);
            candidates.push(SymlinkCandidate { match_name, absolute_path });
        }
    }
    Ok(candidates)
}

pub fn validate_symlink(input: &str, candidates: &[SymlinkCandidate]) -> Result<String, ShellError> {
    if let Some(exact) = candidates.iter().find(|c| c.match_name == input) {
        return Ok(exact.absolute_path.clone());
    }
    let matches: Vec<&SymlinkCandidate> = candidates.iter().filter(|c| c.match_name.starts_with(input)).collect();
    match matches.len() {
        1 => Ok(matches[0].absolute_path.clone()),
        0 => Err(invalid(input, "no matching symlink target")),
        _ => Err(invalid(input, "ambiguous symlink target")),
    }
}

/// Completion candidates are the operator-typed names (exact-else-prefix,
/// spec §4.5), not the absolute paths `validate_symlink` persists.
pub fn complete_symlink(input: &str, candidates: &[SymlinkCandidate]) -> Vec<String> {
    if let Some(exact) = candidates.iter().find(|c| c.match_name == input) {
        return vec![exact.match_name.clone()];
    }
    candidates.iter().filter(|c| c.match_name.starts_with(input)).map(|c| c.match_name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    #[test]
    fn strips_required_suffix_from_candidates() {
        let fs = MemoryFs::new();
        fs.seed_dir("/bases/ifaces");
        fs.seed_file("/bases/ifaces/eth0.iface", b"");
        fs.seed_file("/bases/ifaces/eth1.iface", b"");
        let mut candidates = read_symlink_bases(&fs, &["/bases/ifaces".to_string()], Some(".iface")).unwrap();
        candidates.sort_by(|a, b| a.match_name.cmp(&b.match_name));
        let names: Vec<&str> = candidates.iter().map(|c| c.match_name.as_str()).collect();
        assert_eq!(names, vec!["eth0", "eth1"]);
        assert_eq!(candidates[0].absolute_path, "/bases/ifaces/eth0.iface");
    }

    #[test]
    fn exact_match_wins_and_resolves_to_absolute_target_path() {
        let candidates = vec![
            SymlinkCandidate { match_name: "eth0".to_string(), absolute_path: "/bases/ifaces/eth0.iface".to_string() },
            SymlinkCandidate { match_name: "eth0x".to_string(), absolute_path: "/bases/ifaces/eth0x.iface".to_string() },
        ];
        assert_eq!(validate_symlink("eth0", &candidates).unwrap(), "/bases/ifaces/eth0.iface");
    }

    #[test]
    fn completion_lists_typed_names_not_absolute_paths() {
        let candidates = vec![
            SymlinkCandidate { match_name: "eth0".to_string(), absolute_path: "/bases/ifaces/eth0.iface".to_string() },
            SymlinkCandidate { match_name: "eth1".to_string(), absolute_path: "/bases/ifaces/eth1.iface".to_string() },
        ];
        let mut names = complete_symlink("eth", &candidates);
        names.sort();
        assert_eq!(names, vec!["eth0", "eth1"]);
    }
}
