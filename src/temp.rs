//! Temporary artifact management
//!
//! A [`TempArtifact`] is created with exclusive-create semantics and removed
//! exactly once: either explicitly through [`TempArtifact::release`] or when the
//! guard is dropped. Early returns and `?` therefore never leak the file.

use crate::error::{FabError, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Length of the random part of a temp file name
const SUFFIX_LEN: usize = 6;

/// Exclusively created temporary file, deleted when released or dropped
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    released: bool,
}

impl TempArtifact {
    /// Create `<dir>/<prefix>_<random>.<ext>`.
    ///
    /// Fails with [`FabError::ResourceConflict`] if the path already exists.
    pub fn acquire(dir: &Path, prefix: &str, ext: &str) -> Result<Self> {
        let path = dir.join(format!("{}_{}.{}", prefix, random_suffix(), ext));
        Self::acquire_at(path)
    }

    /// Create exactly `path`, which must not exist yet
    pub fn acquire_at(path: PathBuf) -> Result<Self> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                debug!("Acquired temp file {}", path.display());
                Ok(Self {
                    path,
                    released: false,
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(FabError::ResourceConflict { path }.into())
            }
            Err(e) => Err(FabError::io(path, e).into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now and report the outcome.
    ///
    /// A file that is already gone counts as released.
    pub fn release(mut self) -> std::io::Result<()> {
        self.released = true;
        remove(&self.path)
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = remove(&self.path) {
            warn!("Failed to remove temp file {}: {}", self.path.display(), e);
        }
    }
}

fn remove(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed temp file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Run `body` with a freshly acquired temp file, releasing it on every exit path
pub fn with_temp_artifact<T, F>(dir: &Path, prefix: &str, ext: &str, body: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let artifact = TempArtifact::acquire(dir, prefix, ext)?;
    let result = body(artifact.path());
    if let Err(e) = artifact.release() {
        warn!("Failed to remove temp file: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_named_file() {
        let dir = TempDir::new().unwrap();
        let artifact = TempArtifact::acquire(dir.path(), "temp", "circuit.json").unwrap();

        let name = artifact.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("temp_"));
        assert!(name.ends_with(".circuit.json"));
        assert_eq!(name.len(), "temp_".len() + SUFFIX_LEN + ".circuit.json".len());
        assert!(artifact.path().exists());
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = {
            let artifact = TempArtifact::acquire(dir.path(), "temp", "json").unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_release_is_final() {
        let dir = TempDir::new().unwrap();
        let artifact = TempArtifact::acquire(dir.path(), "temp", "json").unwrap();
        let path = artifact.path().to_path_buf();

        artifact.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_existing_path_is_a_conflict() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp_taken.json");
        std::fs::write(&path, "keep me").unwrap();

        let err = TempArtifact::acquire_at(path.clone()).unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(FabError::ResourceConflict { .. })
        ));
        // the pre-existing file is not ours to delete
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn test_scope_releases_on_error() {
        let dir = TempDir::new().unwrap();
        let mut seen = PathBuf::new();

        let result: Result<()> = with_temp_artifact(dir.path(), "temp", "json", |path| {
            seen = path.to_path_buf();
            assert!(path.exists());
            Err(anyhow::anyhow!("converter blew up"))
        });

        assert!(result.is_err());
        assert!(!seen.exists());
    }

    #[test]
    fn test_scope_tolerates_body_deleting_file() {
        let dir = TempDir::new().unwrap();

        let value = with_temp_artifact(dir.path(), "temp", "json", |path| {
            std::fs::remove_file(path)?;
            Ok(42)
        })
        .unwrap();

        assert_eq!(value, 42);
    }
}
