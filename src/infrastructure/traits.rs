//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io;
use std::path::Path;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
