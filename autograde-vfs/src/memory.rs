//! In-memory file system implementation

use crate::error::{VfsError, VfsResult};
use crate::VirtualFileSystem;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    File(Vec<u8>),
    Dir,
}

/// An in-memory file system.
///
/// Entries live in a `BTreeMap` keyed by normalized path. Writing a file
/// creates its parent directories, unlike the native backend. Clones share
/// the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    entries: Arc<RwLock<BTreeMap<String, Entry>>>,
}

impl MemoryFileSystem {
    /// Create a new empty memory file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new memory file system pre-populated with files.
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let fs = Self::new();
        for (path, content) in files {
            // Writes to memory only fail on invalid paths, which callers control here.
            let _ = fs.write_file(Path::new(path.as_ref()), &content);
        }
        fs
    }

    /// Paths of all files, sorted
    pub fn files(&self) -> Vec<String> {
        self.read()
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Normalize a path: forward slashes, no trailing slash.
    fn normalize(path: &Path) -> VfsResult<String> {
        let raw = path.to_string_lossy().replace('\\', "/");
        if raw.is_empty() {
            return Err(VfsError::InvalidPath {
                path: raw,
                reason: "empty path".to_string(),
            });
        }
        let trimmed = raw.trim_end_matches('/');
        Ok(if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        })
    }

    fn parents(path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = path;
        while let Some(idx) = current.rfind('/') {
            current = &current[..idx];
            if current.is_empty() {
                break;
            }
            out.push(current.to_string());
        }
        out
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Entry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Entry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl VirtualFileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let key = Self::normalize(path)?;
        match self.read().get(&key) {
            Some(Entry::File(bytes)) => Ok(bytes.clone()),
            Some(Entry::Dir) => Err(VfsError::InvalidPath {
                path: key,
                reason: "is a directory".to_string(),
            }),
            None => Err(VfsError::NotFound { path: key }),
        }
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> VfsResult<()> {
        let key = Self::normalize(path)?;
        let mut entries = self.write();
        if matches!(entries.get(&key), Some(Entry::Dir)) {
            return Err(VfsError::InvalidPath {
                path: key,
                reason: "is a directory".to_string(),
            });
        }
        for parent in Self::parents(&key) {
            if let Some(Entry::File(_)) = entries.get(&parent) {
                return Err(VfsError::InvalidPath {
                    path: key,
                    reason: format!("parent '{parent}' is a file"),
                });
            }
            entries.insert(parent, Entry::Dir);
        }
        entries.insert(key, Entry::File(content.to_vec()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> VfsResult<()> {
        let key = Self::normalize(path)?;
        let mut entries = self.write();
        let mut chain = Self::parents(&key);
        chain.insert(0, key);
        for dir in chain {
            match entries.get(&dir) {
                Some(Entry::File(_)) => {
                    return Err(VfsError::InvalidPath {
                        path: dir,
                        reason: "is a file".to_string(),
                    })
                }
                Some(Entry::Dir) => {}
                None => {
                    entries.insert(dir, Entry::Dir);
                }
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> VfsResult<()> {
        let key = Self::normalize(path)?;
        let mut entries = self.write();
        match entries.get(&key) {
            Some(Entry::File(_)) => {
                entries.remove(&key);
                Ok(())
            }
            Some(Entry::Dir) => Err(VfsError::InvalidPath {
                path: key,
                reason: "is a directory".to_string(),
            }),
            None => Err(VfsError::NotFound { path: key }),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        match Self::normalize(path) {
            Ok(key) => key == "/" || self.read().contains_key(&key),
            Err(_) => false,
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        match Self::normalize(path) {
            Ok(key) => matches!(self.read().get(&key), Some(Entry::File(_))),
            Err(_) => false,
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        match Self::normalize(path) {
            Ok(key) => key == "/" || matches!(self.read().get(&key), Some(Entry::Dir)),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_write_and_read() {
        let fs = MemoryFileSystem::new();
        let path = Path::new("/hw/Calc.java");

        fs.write_file(path, b"class Calc {}").unwrap();

        assert_eq!(fs.read_file(path).unwrap(), b"class Calc {}");
        assert_eq!(fs.read_to_string(path).unwrap(), "class Calc {}");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let fs = MemoryFileSystem::new();
        fs.write_file(Path::new("/a/b/c.txt"), b"x").unwrap();

        assert!(fs.is_dir(Path::new("/a")));
        assert!(fs.is_dir(Path::new("/a/b")));
        assert!(fs.is_file(Path::new("/a/b/c.txt")));
        assert!(!fs.is_dir(Path::new("/a/b/c.txt")));
    }

    #[test]
    fn test_create_dir_all_and_trailing_slash() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/staging/run1/")).unwrap();

        assert!(fs.is_dir(Path::new("/staging")));
        assert!(fs.is_dir(Path::new("/staging/run1")));
        assert!(fs.files().is_empty());
    }

    #[test]
    fn test_create_dir_over_file_fails() {
        let fs = MemoryFileSystem::with_files([("/f", b"x".to_vec())]);
        let err = fs.create_dir_all(Path::new("/f/g")).unwrap_err();
        assert!(matches!(err, VfsError::InvalidPath { .. }));
    }

    #[test]
    fn test_remove_file() {
        let fs = MemoryFileSystem::with_files([("/a.txt", b"a".to_vec())]);
        fs.remove_file(Path::new("/a.txt")).unwrap();

        assert!(!fs.exists(Path::new("/a.txt")));
        assert!(matches!(
            fs.remove_file(Path::new("/a.txt")),
            Err(VfsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_dir_is_rejected() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/d")).unwrap();
        assert!(matches!(
            fs.remove_file(Path::new("/d")),
            Err(VfsError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_read_nonexistent() {
        let fs = MemoryFileSystem::new();
        let result = fs.read_file(Path::new("/nonexistent.txt"));
        assert!(matches!(result, Err(VfsError::NotFound { .. })));
    }

    #[test]
    fn test_invalid_utf8() {
        let fs = MemoryFileSystem::with_files([("/bin", vec![0xff, 0xfe])]);
        assert!(matches!(
            fs.read_to_string(Path::new("/bin")),
            Err(VfsError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_backslashes_normalized() {
        let fs = MemoryFileSystem::new();
        fs.write_file(Path::new("\\hw\\A.java"), b"a").unwrap();
        assert!(fs.exists(Path::new("/hw/A.java")));
    }

    #[test]
    fn test_clone_shares_data() {
        let fs1 = MemoryFileSystem::new();
        let path = Path::new("/shared.txt");
        fs1.write_file(path, b"shared").unwrap();

        let fs2 = fs1.clone();
        fs2.write_file(path, b"modified").unwrap();
        assert_eq!(fs1.read_file(path).unwrap(), b"modified");
    }

    #[test]
    fn test_concurrent_writes() {
        let fs = MemoryFileSystem::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let fs = fs.clone();
                thread::spawn(move || {
                    let path = format!("/staging/{i}.java");
                    fs.write_file(Path::new(&path), path.as_bytes()).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(fs.files().len(), 8);
    }
}
