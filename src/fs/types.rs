//! Filesystem abstraction.
//!
//! The core never touches `std::fs` directly — every directory walk,
//! symlink, and rename goes through this trait, so the resolver and the
//! setter's atomic writer can be tested against an in-memory double instead
//! of a real sandboxed temp directory. Modeled on the teacher's
//! `fs::types::FileSystem` trait, trimmed to what a real POSIX tree needs
//! (no buffer encodings, no virtual overlay) and made synchronous since
//! this crate has no async runtime (see DESIGN.md).

use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FsError {
    #[error("ENOENT: no such file or directory, {operation} '{path}'")]
    NotFound { path: String, operation: String },

    #[error("EEXIST: file already exists, {operation} '{path}'")]
    AlreadyExists { path: String, operation: String },

    #[error("ENOTDIR: not a directory, {operation} '{path}'")]
    NotDirectory { path: String, operation: String },

    #[error("ENOTEMPTY: directory not empty, {operation} '{path}'")]
    NotEmpty { path: String, operation: String },

    #[error("EINVAL: invalid argument, {operation} '{path}'")]
    InvalidArgument { path: String, operation: String },

    #[error("EPERM: operation not permitted, {operation} '{path}'")]
    PermissionDenied { path: String, operation: String },

    #[error("{message}")]
    Other { message: String },
}

impl FsError {
    pub fn other(message: impl Into<String>) -> Self {
        FsError::Other { message: message.into() }
    }
}

impl From<std::io::Error> for FsError {
    fn from(e: std::io::Error) -> Self {
        FsError::Other { message: e.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: EntryKind,
    pub len: u64,
    pub mode: u32,
    pub modified: Option<SystemTime>,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Abstract filesystem interface consumed by the resolver, dispatcher, and
/// setter. Paths are plain UTF-8 strings (the sysconf/libexec trees are
/// rooted and never need raw-OsString round-tripping for this shell's
/// purposes).
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &str) -> Result<String, FsError>;
    fn read(&self, path: &str) -> Result<Vec<u8>, FsError>;
    fn write(&self, path: &str, contents: &[u8]) -> Result<(), FsError>;
    fn create_dir_all(&self, path: &str) -> Result<(), FsError>;
    fn remove_file(&self, path: &str) -> Result<(), FsError>;
    fn remove_dir_all(&self, path: &str) -> Result<(), FsError>;
    fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;
    fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError>;
    fn read_link(&self, path: &str) -> Result<String, FsError>;
    fn read_dir(&self, path: &str) -> Result<Vec<DirEntryInfo>, FsError>;
    fn metadata(&self, path: &str) -> Result<Metadata, FsError>;
    fn symlink_metadata(&self, path: &str) -> Result<Metadata, FsError>;
    fn exists(&self, path: &str) -> bool;
    fn set_permissions(&self, path: &str, mode: u32) -> Result<(), FsError>;

    /// Join `base` and `child`, rejecting any result that escapes `base`
    /// via `..` or an absolute override. Spec invariant: a node's
    /// `libexec_path`/`sysconf_path` must reject a merge that would escape
    /// the securely-rooted base.
    fn join_rooted(&self, base: &str, child: &str) -> Result<String, FsError> {
        join_rooted_generic(base, child)
    }
}

/// Pure path-arithmetic helper shared by every `FileSystem` impl: join two
/// path components and verify the result does not escape `base`.
pub fn join_rooted_generic(base: &str, child: &str) -> Result<String, FsError> {
    if child.contains('\0') {
        return Err(FsError::InvalidArgument {
            path: child.to_string(),
            operation: "join_rooted".to_string(),
        });
    }
    if child.starts_with('/') || child == ".." || child.starts_with("../") || child.contains("/../") || child.ends_with("/..") {
        return Err(FsError::PermissionDenied {
            path: child.to_string(),
            operation: "join_rooted (escapes root)".to_string(),
        });
    }
    let base = base.trim_end_matches('/');
    if child.is_empty() {
        return Ok(base.to_string());
    }
    Ok(format!("{}/{}", base, child))
}
