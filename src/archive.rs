//! ZIP archive creation
//!
//! The archive is written to a temp file next to its destination and moved into
//! place only once it is complete, so a failed run never leaves a truncated zip.

use crate::error::{FabError, Result, ResultExt};
use crate::progress::{ProgressTracker, Step};
use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Archive creator for building output ZIP files
pub struct ArchiveCreator;

impl ArchiveCreator {
    /// Create a ZIP file from a collection of files, stored under their file names
    pub fn create_zip<P: AsRef<Path>>(
        files: &[P],
        output_path: &Path,
        tracker: &ProgressTracker,
    ) -> Result<()> {
        info!("Creating ZIP archive {}", output_path.display());

        let parent = match output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| FabError::io(&parent, e))?;

        let mut staging = NamedTempFile::new_in(&parent).map_err(|e| FabError::io(&parent, e))?;

        let progress = tracker.step(Step::Zip, files.len());

        {
            let mut zip = zip::ZipWriter::new(staging.as_file_mut());
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored)
                .unix_permissions(0o644);

            for file_path in files {
                let file_path = file_path.as_ref();
                let file_name = file_path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .context("Invalid filename")?;

                zip.start_file(file_name, options)
                    .context("Failed to start ZIP file entry")?;

                let content = fs::read(file_path).map_err(|e| FabError::io(file_path, e))?;
                zip.write_all(&content)
                    .context("Failed to write file content to ZIP")?;

                ProgressTracker::advance(&progress, file_name);
            }

            zip.finish().context("Failed to finalize ZIP file")?;
        }

        staging
            .persist(output_path)
            .map_err(|e| FabError::io(output_path, e.error))?;

        ProgressTracker::finish(progress, &output_path.display().to_string());
        info!("ZIP file created successfully: {}", output_path.display());
        Ok(())
    }

    /// Names of the entries of an existing archive
    pub fn entry_names(zip_path: &Path) -> Result<Vec<String>> {
        let file = fs::File::open(zip_path).map_err(|e| FabError::io(zip_path, e))?;
        let archive = zip::ZipArchive::new(file)
            .with_path_context("open ZIP archive", zip_path)?;
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        Ok(names)
    }
}
