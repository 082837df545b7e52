//! Error handling for tscircuit-fab
//!
//! Functions return `anyhow::Result` and attach path or operation context on the
//! way up. The [`FabError`] enum classifies failures; callers that need to know
//! why a run failed can `downcast_ref::<FabError>()` on the error chain.

use anyhow::Context;
use std::path::{Path, PathBuf};

pub type Result<T> = anyhow::Result<T>;

/// Extension trait for Results to add context with file paths
pub trait ResultExt<T> {
    /// Add context with file path information
    fn with_path_context<P: AsRef<Path>>(self, operation: &str, path: P) -> Result<T>;

    /// Add context naming the artifact a converter was producing
    fn with_artifact_context(self, artifact: &str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error> + Send + Sync + 'static,
{
    fn with_path_context<P: AsRef<Path>>(self, operation: &str, path: P) -> Result<T> {
        self.map_err(|e| e.into())
            .with_context(|| format!("Failed to {} file: {}", operation, path.as_ref().display()))
    }

    fn with_artifact_context(self, artifact: &str) -> Result<T> {
        self.map_err(|e| e.into())
            .with_context(|| format!("Error generating {}", artifact))
    }
}

/// Failure classes of a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum FabError {
    #[error("{usage}")]
    MissingArgument { usage: String },

    #[error("File '{path}' not found")]
    NotFound { path: String },

    #[error("Part '{part}' not found")]
    PartNotFound { part: String },

    #[error("Export of '{project}' failed: {reason}")]
    ExportFailed { project: String, reason: String },

    #[error("Conversion to {artifact} failed: {reason}")]
    ConversionFailed { artifact: String, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path already exists: {}", path.display())]
    ResourceConflict { path: PathBuf },

    #[error("Invalid output directory {}: {reason}", path.display())]
    InvalidOutputDir { path: PathBuf, reason: String },

    #[error("Network error: {reason}")]
    Network { reason: String },
}

impl FabError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FabError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn conversion(artifact: &str, reason: impl std::fmt::Display) -> Self {
        FabError::ConversionFailed {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Find the first [`FabError`] in an error chain
pub fn classify(err: &anyhow::Error) -> Option<&FabError> {
    err.chain().find_map(|cause| cause.downcast_ref::<FabError>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_context_is_prepended() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result
            .with_path_context("write", "output/bom.csv")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to write file: output/bom.csv"
        );
        assert!(format!("{:#}", err).contains("denied"));
    }

    #[test]
    fn test_classify_finds_wrapped_error() {
        let err: anyhow::Error = FabError::NotFound {
            path: "board.tsx".to_string(),
        }
        .into();
        let err = err.context("Failed to load circuit document");

        assert!(matches!(classify(&err), Some(FabError::NotFound { .. })));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = FabError::io(
            "output/F_Cu.gbr",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(err.to_string().contains("output/F_Cu.gbr"));
    }
}
