//! The setter: validates a row of typed `key=value` pairs against their
//! registered [`validators::Pair`]s and atomically persists them under a
//! command's sysconf directory, with add/set/remove/mark lifecycle
//! semantics (spec §4.5–§4.6).

pub mod atomic;
pub mod validators;

use uuid::Uuid;

use crate::error::{InvalidValueError, ShellError};
use crate::fs::FileSystem;
use crate::userdb::UserDb;
use atomic::{FileKind, PlannedFile};
use validators::Pair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Set,
    Add,
    Remove,
    Mark,
}

/// One `key=value` (or bare positional) operator input, matched against a
/// registered pair by key.
#[derive(Debug, Clone)]
pub struct InputValue {
    pub key: String,
    pub raw_value: String,
}

fn invalid(value: &str, reason: impl Into<String>) -> ShellError {
    ShellError::from(InvalidValueError { value: value.to_string(), reason: reason.into() })
}

fn marker_path(dir: &str, name: &str) -> String {
    format!("{dir}/{name}")
}

/// Find the index value's target row directory by following the symlink
/// named after it at the command's sysconf root.
pub fn resolve_row_dir(fs: &dyn FileSystem, sysconf_root: &str, index_value: &str) -> Result<String, ShellError> {
    let link_path = format!("{sysconf_root}/{index_value}");
    fs.read_link(&link_path).map(|target| {
        if target.starts_with('/') {
            target
        } else {
            format!("{sysconf_root}/{target}")
        }
    })
}

fn plan_files(pairs: &[Pair], values: &[InputValue], row_dir: &str, fs: &dyn FileSystem, userdb: &dyn UserDb) -> Result<Vec<PlannedFile>, ShellError> {
    let mut planned = Vec::new();
    for pair in pairs {
        let input = values.iter().find(|v| v.key == pair.key);
        let raw = match input {
            Some(v) => v.raw_value.as_str(),
            None if pair.optional => continue,
            None => return Err(invalid(&pair.key, "required pair not supplied")),
        };
        let canonical = validators::validate(pair, raw, fs, userdb)?;
        if pair.optional && canonical == "none" {
            continue;
        }
        let kind = match &pair.type_tag {
            validators::ValueType::Symlink { .. } => FileKind::Symlink,
            _ => FileKind::Regular,
        };
        let destination_path = format!("{row_dir}/{}{}", pair.key, pair.suffix);
        planned.push(PlannedFile { key: pair.key.clone(), destination_path, value: canonical, kind, is_index: pair.is_index });
    }
    Ok(planned)
}

/// Set mode: the row must already exist (resolved via its index symlink);
/// validate every pair, write files, then the `updated` marker.
pub fn run_set(fs: &dyn FileSystem, userdb: &dyn UserDb, sysconf_root: &str, index_value: &str, pairs: &[Pair], values: &[InputValue], umask: u32) -> Result<(), ShellError> {
    let row_dir = resolve_row_dir(fs, sysconf_root, index_value)?;
    let planned = plan_files(pairs, values, &row_dir, fs, userdb)?;
    atomic::commit_files(fs, &planned, umask)?;
    atomic::write_marker(fs, &row_dir, "updated")
}

/// Add mode: allocate a fresh UUID directory, require every non-optional
/// pair, write files + `added` marker, then symlink the index value to the
/// new row.
pub fn run_add(fs: &dyn FileSystem, userdb: &dyn UserDb, sysconf_root: &str, pairs: &[Pair], values: &[InputValue], umask: u32) -> Result<String, ShellError> {
    let index_pair = pairs.iter().find(|p| p.is_index).ok_or_else(|| invalid("", "no index pair registered"))?;
    let index_value = values
        .iter()
        .find(|v| v.key == index_pair.key)
        .map(|v| v.raw_value.clone())
        .ok_or_else(|| invalid(&index_pair.key, "index value required for add"))?;

    let row_id = Uuid::new_v4().to_string();
    let row_dir = format!("{sysconf_root}/{row_id}");
    fs.create_dir_all(&row_dir)?;

    let result = (|| -> Result<(), ShellError> {
        let planned = plan_files(pairs, values, &row_dir, fs, userdb)?;
        atomic::commit_files(fs, &planned, umask)?;
        atomic::write_marker(fs, &row_dir, "added")?;
        let link_path = format!("{sysconf_root}/{index_value}");
        fs.symlink(&row_id, &link_path)?;
        Ok(())
    })();

    match result {
        Ok(()) => Ok(row_id),
        Err(e) => {
            atomic::rollback_new_directory(fs, &row_dir)?;
            Err(e)
        }
    }
}

/// Remove mode: refuse if the row contains anything unexpected, rename it
/// aside (`;<pid>` suffix), delete its contents, then remove the renamed
/// directory.
pub fn run_remove(fs: &dyn FileSystem, sysconf_root: &str, index_value: &str, expected_entries: &[String]) -> Result<(), ShellError> {
    let row_dir = resolve_row_dir(fs, sysconf_root, index_value)?;
    let entries = fs.read_dir(&row_dir)?;
    for entry in &entries {
        let is_hidden = entry.name.starts_with('.');
        let is_expected = expected_entries.iter().any(|e| e == &entry.name) || matches!(entry.kind, crate::fs::EntryKind::File) && expected_entries.is_empty();
        if is_hidden || (!is_expected && entry.kind == crate::fs::EntryKind::Directory) {
            return Err(invalid(&entry.name, "unexpected hidden file or subdirectory in row, refusing to remove"));
        }
    }
    let aside = format!("{row_dir};{}", std::process::id());
    fs.rename(&row_dir, &aside)?;
    fs.remove_dir_all(&aside)?;
    let link_path = format!("{sysconf_root}/{index_value}");
    if fs.exists(&link_path) {
        fs.remove_file(&link_path)?;
    }
    Ok(())
}

/// Mark mode: write the `removed` marker in the target row directory
/// without deleting anything.
pub fn run_mark(fs: &dyn FileSystem, sysconf_root: &str, index_value: &str) -> Result<(), ShellError> {
    let row_dir = resolve_row_dir(fs, sysconf_root, index_value)?;
    atomic::write_marker(fs, &row_dir, "removed")
}
