//! AutoGrade Virtual File System
//!
//! File access used by the unit compiler: reading submissions and writing
//! staging copies for toolchains that need a file on disk.
//!
//! # Usage
//! ```rust
//! use autograde_vfs::{MemoryFileSystem, VirtualFileSystem};
//! use std::path::Path;
//!
//! let fs = MemoryFileSystem::new();
//! fs.write_file(Path::new("/hw/Calc.java"), b"public class Calc {}").unwrap();
//! assert_eq!(fs.read_to_string(Path::new("/hw/Calc.java")).unwrap(), "public class Calc {}");
//! assert!(fs.is_dir(Path::new("/hw")));
//! ```

mod error;
mod memory;
mod native;
mod r#trait;

pub use error::{VfsError, VfsResult};
pub use memory::MemoryFileSystem;
pub use native::NativeFileSystem;
pub use r#trait::VirtualFileSystem;

/// Create a new memory-based file system.
pub fn memory_fs() -> MemoryFileSystem {
    MemoryFileSystem::new()
}

/// Create a new native file system.
pub fn native_fs() -> NativeFileSystem {
    NativeFileSystem::new()
}
