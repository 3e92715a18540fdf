//! In-memory [`FileSystem`] double used by resolver/discovery/setter unit
//! tests. Not a general-purpose virtual filesystem — just enough CRUD and
//! symlink support to exercise the namespace walker and atomic writer
//! without touching a real directory tree.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::SystemTime;

use super::types::{DirEntryInfo, EntryKind, FileSystem, FsError, Metadata};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>, u32),
    Dir(u32),
    Symlink(String),
}

pub struct MemoryFs {
    nodes: Mutex<BTreeMap<String, Node>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir(0o755));
        MemoryFs { nodes: Mutex::new(nodes) }
    }

    fn normalize(path: &str) -> String {
        if path.is_empty() {
            return "/".to_string();
        }
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn parent_of(path: &str) -> String {
        match path.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => path[..idx].to_string(),
            None => "/".to_string(),
        }
    }

    /// Seed a file directly, creating parent directories as needed. Test helper.
    pub fn seed_file(&self, path: &str, contents: &[u8]) {
        let path = Self::normalize(path);
        self.ensure_parents(&path);
        self.nodes.lock().unwrap().insert(path, Node::File(contents.to_vec(), 0o644));
    }

    /// Seed a directory directly. Test helper.
    pub fn seed_dir(&self, path: &str) {
        let path = Self::normalize(path);
        self.ensure_parents(&path);
        self.nodes.lock().unwrap().insert(path, Node::Dir(0o755));
    }

    /// Seed a symlink directly. Test helper.
    pub fn seed_symlink(&self, path: &str, target: &str) {
        let path = Self::normalize(path);
        self.ensure_parents(&path);
        self.nodes.lock().unwrap().insert(path, Node::Symlink(target.to_string()));
    }

    fn ensure_parents(&self, path: &str) {
        let mut parent = Self::parent_of(path);
        let mut stack = Vec::new();
        let mut nodes = self.nodes.lock().unwrap();
        while !nodes.contains_key(&parent) {
            stack.push(parent.clone());
            if parent == "/" {
                break;
            }
            parent = Self::parent_of(&parent);
        }
        for p in stack.into_iter().rev() {
            nodes.insert(p, Node::Dir(0o755));
        }
    }
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &str) -> Result<String, FsError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|_| FsError::other(format!("read '{path}': not valid UTF-8")))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let path = Self::normalize(path);
        let node = self.nodes.lock().unwrap().get(&path).cloned();
        match node {
            Some(Node::File(bytes, _)) => Ok(bytes),
            Some(Node::Dir(_)) => Err(FsError::InvalidArgument { path, operation: "read".to_string() }),
            Some(Node::Symlink(target)) => self.read(&target),
            None => Err(FsError::NotFound { path, operation: "read".to_string() }),
        }
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let path = Self::normalize(path);
        self.ensure_parents(&path);
        self.nodes.lock().unwrap().insert(path, Node::File(contents.to_vec(), 0o644));
        Ok(())
    }

    fn create_dir_all(&self, path: &str) -> Result<(), FsError> {
        let path = Self::normalize(path);
        self.ensure_parents(&path);
        self.nodes.lock().unwrap().entry(path).or_insert(Node::Dir(0o755));
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<(), FsError> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get(&path) {
            Some(Node::Dir(_)) => Err(FsError::NotDirectory { path, operation: "unlink".to_string() }),
            Some(_) => {
                nodes.remove(&path);
                Ok(())
            }
            None => Err(FsError::NotFound { path, operation: "unlink".to_string() }),
        }
    }

    fn remove_dir_all(&self, path: &str) -> Result<(), FsError> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(&path) {
            return Err(FsError::NotFound { path, operation: "rmdir".to_string() });
        }
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let doomed: Vec<String> = nodes.keys().filter(|k| k.starts_with(&prefix) || **k == path).cloned().collect();
        for k in doomed {
            nodes.remove(&k);
        }
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from = Self::normalize(from);
        let to = Self::normalize(to);
        self.ensure_parents(&to);
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.remove(&from).ok_or_else(|| FsError::NotFound { path: from.clone(), operation: "rename".to_string() })?;
        nodes.insert(to, node);
        Ok(())
    }

    fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError> {
        let link_path = Self::normalize(link_path);
        self.ensure_parents(&link_path);
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.contains_key(&link_path) {
            return Err(FsError::AlreadyExists { path: link_path, operation: "symlink".to_string() });
        }
        nodes.insert(link_path, Node::Symlink(target.to_string()));
        Ok(())
    }

    fn read_link(&self, path: &str) -> Result<String, FsError> {
        let path = Self::normalize(path);
        match self.nodes.lock().unwrap().get(&path) {
            Some(Node::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(FsError::InvalidArgument { path, operation: "readlink".to_string() }),
            None => Err(FsError::NotFound { path, operation: "readlink".to_string() }),
        }
    }

    fn read_dir(&self, path: &str) -> Result<Vec<DirEntryInfo>, FsError> {
        let path = Self::normalize(path);
        let nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(&path), Some(Node::Dir(_))) {
            return Err(FsError::NotDirectory { path, operation: "readdir".to_string() });
        }
        let prefix = if path == "/" { "/".to_string() } else { format!("{}/", path) };
        let mut out = Vec::new();
        for (k, v) in nodes.iter() {
            if let Some(rest) = k.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    let kind = match v {
                        Node::File(..) => EntryKind::File,
                        Node::Dir(_) => EntryKind::Directory,
                        Node::Symlink(_) => EntryKind::Symlink,
                    };
                    out.push(DirEntryInfo { name: rest.to_string(), kind });
                }
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn metadata(&self, path: &str) -> Result<Metadata, FsError> {
        let resolved = Self::normalize(path);
        let nodes = self.nodes.lock().unwrap();
        let mut current = resolved.clone();
        let mut hops = 0;
        loop {
            hops += 1;
            if hops > 32 {
                return Err(FsError::other(format!("'{path}': too many levels of symbolic links")));
            }
            match nodes.get(&current) {
                Some(Node::File(bytes, mode)) => {
                    return Ok(Metadata { kind: EntryKind::File, len: bytes.len() as u64, mode: *mode, modified: Some(SystemTime::now()) });
                }
                Some(Node::Dir(mode)) => {
                    return Ok(Metadata { kind: EntryKind::Directory, len: 0, mode: *mode, modified: Some(SystemTime::now()) });
                }
                Some(Node::Symlink(target)) => {
                    current = Self::normalize(target);
                }
                None => return Err(FsError::NotFound { path: path.to_string(), operation: "stat".to_string() }),
            }
        }
    }

    fn symlink_metadata(&self, path: &str) -> Result<Metadata, FsError> {
        let path_n = Self::normalize(path);
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(&path_n) {
            Some(Node::File(bytes, mode)) => Ok(Metadata { kind: EntryKind::File, len: bytes.len() as u64, mode: *mode, modified: Some(SystemTime::now()) }),
            Some(Node::Dir(mode)) => Ok(Metadata { kind: EntryKind::Directory, len: 0, mode: *mode, modified: Some(SystemTime::now()) }),
            Some(Node::Symlink(_)) => Ok(Metadata { kind: EntryKind::Symlink, len: 0, mode: 0o777, modified: Some(SystemTime::now()) }),
            None => Err(FsError::NotFound { path: path.to_string(), operation: "lstat".to_string() }),
        }
    }

    fn exists(&self, path: &str) -> bool {
        let path = Self::normalize(path);
        self.nodes.lock().unwrap().contains_key(&path)
    }

    fn set_permissions(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let path = Self::normalize(path);
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get_mut(&path) {
            Some(Node::File(_, m)) | Some(Node::Dir(m)) => {
                *m = mode;
                Ok(())
            }
            Some(Node::Symlink(_)) => Ok(()),
            None => Err(FsError::NotFound { path, operation: "chmod".to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let fs = MemoryFs::new();
        fs.write("/a/b/c.txt", b"hi").unwrap();
        assert_eq!(fs.read_to_string("/a/b/c.txt").unwrap(), "hi");
        assert!(fs.exists("/a/b"));
        assert!(fs.exists("/a"));
    }

    #[test]
    fn read_dir_lists_immediate_children_only() {
        let fs = MemoryFs::new();
        fs.seed_file("/libexec/show/cmd", b"#!/bin/sh\n");
        fs.seed_dir("/libexec/show/sub");
        fs.seed_file("/libexec/show/sub/deep", b"x");
        let entries = fs.read_dir("/libexec/show").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["cmd", "sub"]);
    }

    #[test]
    fn read_follows_a_symlink_without_deadlocking() {
        let fs = MemoryFs::new();
        fs.seed_file("/real", b"data");
        fs.seed_symlink("/link", "/real");
        assert_eq!(fs.read_to_string("/link").unwrap(), "data");
    }

    #[test]
    fn symlink_resolves_through_metadata() {
        let fs = MemoryFs::new();
        fs.seed_file("/real", b"data");
        fs.seed_symlink("/link", "/real");
        assert_eq!(fs.metadata("/link").unwrap().kind, EntryKind::File);
        assert_eq!(fs.symlink_metadata("/link").unwrap().kind, EntryKind::Symlink);
    }

    #[test]
    fn rename_moves_entry() {
        let fs = MemoryFs::new();
        fs.seed_file("/old", b"data");
        fs.rename("/old", "/new").unwrap();
        assert!(!fs.exists("/old"));
        assert_eq!(fs.read_to_string("/new").unwrap(), "data");
    }
}
