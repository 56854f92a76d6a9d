//! VirtualFileSystem trait definition

use crate::error::{VfsError, VfsResult};
use std::path::Path;

/// Virtual File System trait
///
/// Decouples the unit compiler from the concrete file system so staging can
/// be exercised in memory.
///
/// # Implementations
/// - `MemoryFileSystem`: In-memory file system
/// - `NativeFileSystem`: Native OS file system
pub trait VirtualFileSystem: Send + Sync {
    /// Read file contents
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>>;

    /// Write file contents
    ///
    /// Creates the file if it doesn't exist, truncates it if it does. The
    /// parent directory must exist.
    fn write_file(&self, path: &Path, content: &[u8]) -> VfsResult<()>;

    /// Create a directory and all of its missing parents
    fn create_dir_all(&self, path: &Path) -> VfsResult<()>;

    /// Remove a single file
    fn remove_file(&self, path: &Path) -> VfsResult<()>;

    /// Check if path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Read a file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> VfsResult<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).map_err(|_| VfsError::InvalidUtf8 {
            path: path.to_string_lossy().to_string(),
        })
    }
}
