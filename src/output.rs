//! Output artifacts and the writer that puts them on disk

use crate::archive::ArchiveCreator;
use crate::error::{FabError, Result};
use crate::progress::{ProgressTracker, Step};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What an artifact contains, which fixes its file extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    Gerber,
    Drill,
    Csv,
    Svg,
    /// Source file with a caller-chosen extension, e.g. `tsx`
    Source(String),
}

impl ArtifactKind {
    pub fn extension(&self) -> &str {
        match self {
            ArtifactKind::Gerber => "gbr",
            ArtifactKind::Drill => "drl",
            ArtifactKind::Csv => "csv",
            ArtifactKind::Svg => "svg",
            ArtifactKind::Source(ext) => ext,
        }
    }
}

/// A named unit of output content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub kind: ArtifactKind,
    pub content: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, kind: ArtifactKind, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            kind,
            content: content.into(),
        }
    }

    /// `<name>.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }
}

/// Artifacts of one run in insertion order, unique by name
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact, replacing an earlier one of the same name
    pub fn insert(&mut self, artifact: Artifact) {
        match self.artifacts.iter_mut().find(|a| a.name == artifact.name) {
            Some(existing) => *existing = artifact,
            None => self.artifacts.push(artifact),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// File names in insertion order
    pub fn file_names(&self) -> Vec<String> {
        self.artifacts.iter().map(Artifact::file_name).collect()
    }
}

/// Writes artifact sets into directories and packages them
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    tracker: ProgressTracker,
}

impl OutputWriter {
    pub fn new(tracker: ProgressTracker) -> Self {
        Self { tracker }
    }

    /// Write every artifact to `<dir>/<name>.<ext>`, creating `dir` if needed.
    ///
    /// The first failed write aborts with [`FabError::Io`] naming the file.
    pub fn write_all(&self, artifacts: &ArtifactSet, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| FabError::io(dir, e))?;

        let progress = self.tracker.step(Step::Write, artifacts.len());
        let mut written = Vec::with_capacity(artifacts.len());

        for artifact in artifacts.iter() {
            let path = dir.join(artifact.file_name());
            if let Err(e) = fs::write(&path, &artifact.content) {
                ProgressTracker::abandon(progress, &artifact.file_name());
                return Err(FabError::io(path, e).into());
            }
            debug!("Written output file: {}", path.display());
            if !self.tracker.is_enabled() {
                println!("Generated {}", artifact.file_name());
            }
            ProgressTracker::advance(&progress, &artifact.file_name());
            written.push(path);
        }

        ProgressTracker::finish(progress, &format!("{} files", written.len()));
        Ok(written)
    }

    /// Write the artifacts into a fresh `dir`, archive them into `zip_path` and
    /// delete `dir` again.
    ///
    /// `dir` must not exist yet: a pre-existing directory fails with
    /// [`FabError::ResourceConflict`] and is left untouched. Only the files this
    /// call wrote go into the archive, and `dir` is removed whether or not
    /// archiving succeeded.
    pub fn package(&self, artifacts: &ArtifactSet, dir: &Path, zip_path: &Path) -> Result<()> {
        if fs::symlink_metadata(dir).is_ok() {
            return Err(FabError::ResourceConflict {
                path: dir.to_path_buf(),
            }
            .into());
        }
        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FabError::io(parent, e))?;
        }
        fs::create_dir(dir).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => FabError::ResourceConflict {
                path: dir.to_path_buf(),
            },
            _ => FabError::io(dir, e),
        })?;
        debug!("Created staging directory: {}", dir.display());

        let result = self.write_all(artifacts, dir).and_then(|mut written| {
            written.sort();
            ArchiveCreator::create_zip(&written, zip_path, &self.tracker)
        });

        if let Err(e) = fs::remove_dir_all(dir) {
            warn!("Failed to remove staging directory {}: {}", dir.display(), e);
        }

        result?;
        info!("Packaged {} artifacts into {}", artifacts.len(), zip_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use tempfile::TempDir;

    fn sample() -> ArtifactSet {
        let mut set = ArtifactSet::new();
        set.insert(Artifact::new("F_Cu", ArtifactKind::Gerber, "G04*\nM02*\n"));
        set.insert(Artifact::new("plated", ArtifactKind::Drill, "M48\nM30\n"));
        set.insert(Artifact::new("bom", ArtifactKind::Csv, "Designator\n"));
        set
    }

    #[test]
    fn test_extensions() {
        assert_eq!(ArtifactKind::Gerber.extension(), "gbr");
        assert_eq!(ArtifactKind::Drill.extension(), "drl");
        assert_eq!(ArtifactKind::Csv.extension(), "csv");
        assert_eq!(ArtifactKind::Source("tsx".to_string()).extension(), "tsx");
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let mut set = sample();
        set.insert(Artifact::new("bom", ArtifactKind::Csv, "Designator,Value\n"));

        assert_eq!(set.len(), 3);
        assert_eq!(set.get("bom").unwrap().content, b"Designator,Value\n");
    }

    #[test]
    fn test_write_all_creates_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("output");

        let written = OutputWriter::new(ProgressTracker::new(false))
            .write_all(&sample(), &out)
            .unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(fs::read_to_string(out.join("F_Cu.gbr")).unwrap(), "G04*\nM02*\n");
        assert!(out.join("plated.drl").exists());
        assert!(out.join("bom.csv").exists());
    }

    #[test]
    fn test_write_failure_names_path() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("output");
        // a directory where the file should go makes the write fail
        fs::create_dir_all(out.join("bom.csv")).unwrap();

        let err = OutputWriter::new(ProgressTracker::new(false))
            .write_all(&sample(), &out)
            .unwrap_err();

        match classify(&err) {
            Some(FabError::Io { path, .. }) => assert!(path.ends_with("bom.csv")),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_package_leaves_only_zip() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("output");
        let zip_path = dir.path().join("output.zip");

        OutputWriter::new(ProgressTracker::new(false))
            .package(&sample(), &out, &zip_path)
            .unwrap();

        assert!(!out.exists());
        assert_eq!(
            ArchiveCreator::entry_names(&zip_path).unwrap(),
            ["F_Cu.gbr", "bom.csv", "plated.drl"]
        );
    }

    #[test]
    fn test_package_refuses_existing_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("output");
        let zip_path = dir.path().join("output.zip");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("notes.txt"), "keep me").unwrap();

        let err = OutputWriter::new(ProgressTracker::new(false))
            .package(&sample(), &out, &zip_path)
            .unwrap_err();

        assert!(matches!(classify(&err), Some(FabError::ResourceConflict { .. })));
        assert_eq!(fs::read_to_string(out.join("notes.txt")).unwrap(), "keep me");
        assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
        assert!(!zip_path.exists());
    }

    #[test]
    fn test_package_failure_removes_own_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("output");
        // the zip destination is a directory, so persisting the archive fails
        let zip_path = dir.path().join("output.zip");
        fs::create_dir_all(zip_path.join("occupied")).unwrap();

        let result =
            OutputWriter::new(ProgressTracker::new(false)).package(&sample(), &out, &zip_path);

        assert!(result.is_err());
        assert!(!out.exists());
        assert!(zip_path.join("occupied").exists());
    }
}
