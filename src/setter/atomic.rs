//! Atomic file writer: rename-to-backup, stage via temp file or pending
//! symlink, then commit by renaming every stage file onto its destination.
//! Failure before the commit phase rolls everything back; failure during
//! commit is logged, not rolled back (spec §4.6).

use tracing::error;

use crate::error::{IoFailureError, ShellError};
use crate::fs::FileSystem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Symlink,
}

/// One file the setter intends to write, already validated.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub key: String,
    pub destination_path: String,
    pub value: String,
    pub kind: FileKind,
    pub is_index: bool,
}

struct Staged {
    destination: String,
    stage_path: String,
    backup_path: Option<String>,
}

/// Write every planned file atomically. On any staging failure, everything
/// staged so far (and any backups taken) is rolled back before the error
/// propagates.
pub fn commit_files(fs: &dyn FileSystem, files: &[PlannedFile], umask: u32) -> Result<(), ShellError> {
    let mut staged: Vec<Staged> = Vec::new();

    let stage_result = (|| -> Result<(), ShellError> {
        for file in files {
            let backup_path = if fs.exists(&file.destination_path) {
                let backup = format!("{}.backup", file.destination_path);
                fs.rename(&file.destination_path, &backup)?;
                Some(backup)
            } else {
                None
            };

            let stage_path = match file.kind {
                FileKind::Regular => {
                    let stage = secure_temp_name(&file.destination_path);
                    fs.write(&stage, file.value.as_bytes())?;
                    fs.set_permissions(&stage, 0o666 & !umask)?;
                    stage
                }
                FileKind::Symlink => {
                    let stage = format!("{};{}", file.destination_path, std::process::id());
                    fs.symlink(&file.value, &stage)?;
                    stage
                }
            };

            staged.push(Staged { destination: file.destination_path.clone(), stage_path, backup_path });
        }
        Ok(())
    })();

    if let Err(e) = stage_result {
        rollback(fs, &staged);
        return Err(e);
    }

    for s in &staged {
        if let Err(e) = fs.rename(&s.stage_path, &s.destination) {
            error!(destination = %s.destination, error = %e, "atomic writer: final rename failed, not rolling back");
            continue;
        }
        if let Some(backup) = &s.backup_path {
            if let Err(e) = fs.remove_file(backup) {
                error!(backup = %backup, error = %e, "atomic writer: failed to remove backup after commit");
            }
        }
    }

    Ok(())
}

fn rollback(fs: &dyn FileSystem, staged: &[Staged]) {
    for s in staged {
        let _ = fs.remove_file(&s.stage_path);
        if let Some(backup) = &s.backup_path {
            if let Err(e) = fs.rename(backup, &s.destination) {
                error!(backup = %backup, error = %e, "atomic writer: rollback failed to restore backup");
            }
        }
    }
}

/// Generate a secure temp-file path on the `<dest>.XXXXXX` template, in the
/// destination's own directory so the final rename stays on one filesystem.
/// The random component comes from `uuid` rather than a real `mktemp(3)`
/// call, since the stage file itself is created through the abstract
/// `FileSystem` trait (see module docs) and must not assume a real disk is
/// backing it.
fn secure_temp_name(destination: &str) -> String {
    let mut rand_bytes = [0u8; 6];
    let uuid = uuid::Uuid::new_v4();
    rand_bytes.copy_from_slice(&uuid.as_bytes()[..6]);
    let suffix: String = rand_bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{destination}.{suffix}")
}

/// Roll back an Add-mode directory creation: remove the freshly-created
/// row directory entirely.
pub fn rollback_new_directory(fs: &dyn FileSystem, dir: &str) -> Result<(), ShellError> {
    fs.remove_dir_all(dir).map_err(ShellError::from)
}

/// Roll back a Set-mode `updated` marker write.
pub fn remove_marker(fs: &dyn FileSystem, marker_path: &str) -> Result<(), ShellError> {
    if fs.exists(marker_path) {
        fs.remove_file(marker_path)?;
    }
    Ok(())
}

pub fn write_marker(fs: &dyn FileSystem, dir: &str, name: &str) -> Result<(), ShellError> {
    let path = format!("{dir}/{name}");
    fs.write(&path, b"")?;
    // DEFAULT & ~0o113, per spec §6.
    fs.set_permissions(&path, 0o644 & !0o113).map_err(ShellError::from)
}

#[allow(dead_code)]
fn io_err(message: impl Into<String>) -> ShellError {
    ShellError::from(IoFailureError { message: message.into() })
}
