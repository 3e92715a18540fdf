//! `std::fs`-backed [`FileSystem`] implementation used by the shipped binaries.

use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::time::SystemTime;

use super::types::{DirEntryInfo, EntryKind, FileSystem, FsError, Metadata};

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        RealFs
    }

    fn wrap<T>(path: &str, operation: &str, result: std::io::Result<T>) -> Result<T, FsError> {
        result.map_err(|e| map_io_error(e, path, operation))
    }
}

fn map_io_error(e: std::io::Error, path: &str, operation: &str) -> FsError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::NotFound => FsError::NotFound { path: path.to_string(), operation: operation.to_string() },
        ErrorKind::AlreadyExists => FsError::AlreadyExists { path: path.to_string(), operation: operation.to_string() },
        ErrorKind::PermissionDenied => FsError::PermissionDenied { path: path.to_string(), operation: operation.to_string() },
        _ => match e.raw_os_error() {
            Some(libc::ENOTDIR) => FsError::NotDirectory { path: path.to_string(), operation: operation.to_string() },
            Some(libc::ENOTEMPTY) => FsError::NotEmpty { path: path.to_string(), operation: operation.to_string() },
            Some(libc::EINVAL) => FsError::InvalidArgument { path: path.to_string(), operation: operation.to_string() },
            _ => FsError::Other { message: format!("{operation} '{path}': {e}") },
        },
    }
}

fn std_metadata_to_meta(m: fs::Metadata) -> Metadata {
    let kind = if m.file_type().is_symlink() {
        EntryKind::Symlink
    } else if m.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    Metadata {
        kind,
        len: m.len(),
        mode: m.permissions().mode(),
        modified: m.modified().ok().or(Some(SystemTime::now())),
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &str) -> Result<String, FsError> {
        Self::wrap(path, "read", fs::read_to_string(path))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        Self::wrap(path, "read", fs::read(path))
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        Self::wrap(path, "write", fs::write(path, contents))
    }

    fn create_dir_all(&self, path: &str) -> Result<(), FsError> {
        Self::wrap(path, "mkdir", fs::create_dir_all(path))
    }

    fn remove_file(&self, path: &str) -> Result<(), FsError> {
        Self::wrap(path, "unlink", fs::remove_file(path))
    }

    fn remove_dir_all(&self, path: &str) -> Result<(), FsError> {
        Self::wrap(path, "rmdir", fs::remove_dir_all(path))
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        Self::wrap(from, "rename", fs::rename(from, to))
    }

    fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError> {
        Self::wrap(link_path, "symlink", std::os::unix::fs::symlink(target, link_path))
    }

    fn read_link(&self, path: &str) -> Result<String, FsError> {
        let target = Self::wrap(path, "readlink", fs::read_link(path))?;
        target
            .into_os_string()
            .into_string()
            .map_err(|_| FsError::other(format!("readlink '{path}': not valid UTF-8")))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntryInfo>, FsError> {
        let rd = Self::wrap(path, "readdir", fs::read_dir(path))?;
        let mut entries = Vec::new();
        for entry in rd {
            let entry = Self::wrap(path, "readdir", entry)?;
            let name = entry.file_name().into_string().map_err(|_| {
                FsError::other(format!("readdir '{path}': entry not valid UTF-8"))
            })?;
            let ft = Self::wrap(path, "readdir", entry.file_type())?;
            let kind = if ft.is_symlink() {
                EntryKind::Symlink
            } else if ft.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntryInfo { name, kind });
        }
        Ok(entries)
    }

    fn metadata(&self, path: &str) -> Result<Metadata, FsError> {
        Self::wrap(path, "stat", fs::metadata(path)).map(std_metadata_to_meta)
    }

    fn symlink_metadata(&self, path: &str) -> Result<Metadata, FsError> {
        Self::wrap(path, "lstat", fs::symlink_metadata(path)).map(std_metadata_to_meta)
    }

    fn exists(&self, path: &str) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn set_permissions(&self, path: &str, mode: u32) -> Result<(), FsError> {
        Self::wrap(path, "chmod", fs::set_permissions(path, std::fs::Permissions::from_mode(mode)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.txt");
        let path = path.to_str().unwrap();
        let rfs = RealFs::new();
        rfs.write(path, b"hello").unwrap();
        assert_eq!(rfs.read_to_string(path).unwrap(), "hello");
        assert!(rfs.exists(path));
        rfs.remove_file(path).unwrap();
        assert!(!rfs.exists(path));
    }

    #[test]
    fn not_found_maps_to_fserror_not_found() {
        let rfs = RealFs::new();
        let err = rfs.read("/nonexistent/definitely/not/here").unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }
}
