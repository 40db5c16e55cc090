//! Scoped scratch directories
//!
//! The directory is removed when the handle drops, on success, error or
//! unwind alike, unless it was created with `preserve` set.

use cladetime_core::CladetimeResult;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct ScratchDir {
    root: PathBuf,
    preserve: bool,
}

impl ScratchDir {
    pub fn new(prefix: &str, preserve: bool) -> CladetimeResult<Self> {
        let root = tempfile::Builder::new()
            .prefix(&format!("cladetime-{}-", prefix))
            .tempdir()?
            .keep();
        debug!(path = %root.display(), "Created scratch directory");
        Ok(Self { root, preserve })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create and return a subdirectory
    pub fn subdir(&self, name: &str) -> CladetimeResult<PathBuf> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.preserve {
            warn!(path = %self.root.display(), "Scratch directory preserved");
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            warn!(path = %self.root.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let path = {
            let scratch = ScratchDir::new("test", false).unwrap();
            std::fs::write(scratch.join("file.txt"), b"x").unwrap();
            scratch.subdir("dataset").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_removed_when_unwinding() {
        let mut seen = None;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let scratch = ScratchDir::new("panic", false).unwrap();
            seen = Some(scratch.path().to_path_buf());
            panic!("classifier blew up");
        }));
        assert!(result.is_err());
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn test_preserved() {
        let scratch = ScratchDir::new("keep", true).unwrap();
        let path = scratch.path().to_path_buf();
        drop(scratch);
        assert!(path.exists());
        std::fs::remove_dir_all(path).unwrap();
    }
}
