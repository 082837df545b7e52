//! Packaging pipeline
//!
//! Exports the tscircuit project to a circuit document, fans it out to the
//! Gerber, drill, BOM and pick-and-place converters, and packages the results
//! into a single archive.

use crate::{
    circuit::CircuitDocument,
    config::PackageConfig,
    converters::Converters,
    error::{Result, ResultExt},
    exporter::{CommandRunner, Exporter, SystemCommandRunner},
    output::{Artifact, ArtifactKind, ArtifactSet, OutputWriter},
    progress::ProgressTracker,
};
use anyhow::Context;
use std::path::PathBuf;
use tracing::{debug, info};

/// Drill file names by plating
const PLATED_DRILL: &str = "plated";
const UNPLATED_DRILL: &str = "unplated";

/// The packaging pipeline
pub struct Packager<R: CommandRunner> {
    config: PackageConfig,
    exporter: Exporter<R>,
    converters: Converters,
    progress_tracker: ProgressTracker,
}

impl Packager<SystemCommandRunner> {
    /// Pipeline running the configured exporter with the built-in converters
    pub fn system(config: PackageConfig) -> Self {
        let exporter = Exporter::system(config.exporter.clone());
        Self::new(config, exporter, Converters::builtin())
    }
}

impl<R: CommandRunner> Packager<R> {
    pub fn new(config: PackageConfig, exporter: Exporter<R>, converters: Converters) -> Self {
        let progress_enabled = !config.no_progress;

        Self {
            config,
            exporter,
            converters,
            progress_tracker: ProgressTracker::new(progress_enabled),
        }
    }

    /// Run the complete packaging process
    pub fn run(&self) -> Result<ConversionStats> {
        let start = std::time::Instant::now();
        info!("Starting packaging process...");

        self.config
            .validate()
            .context("Configuration validation failed")?;

        let document = self
            .exporter
            .load_circuit_document(&self.config.entry, &self.config.work_dir)
            .with_path_context("export project", &self.config.entry)?;

        let artifacts = self
            .build_artifacts(&document)
            .context("Failed to convert circuit document")?;

        let output_dir = self.config.resolved_output_dir();
        let zip_path = self.config.resolved_zip_path();

        OutputWriter::new(self.progress_tracker)
            .package(&artifacts, &output_dir, &zip_path)
            .context("Failed to create output")?;

        println!(
            "Generated {}",
            zip_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| zip_path.display().to_string())
        );

        info!("Packaging completed in {} ms", start.elapsed().as_millis());
        Ok(ConversionStats {
            total_files: artifacts.len(),
            file_names: artifacts.file_names(),
            zip_path,
        })
    }

    /// Run every converter over the document.
    ///
    /// Drill files are left out when there is nothing to drill.
    pub fn build_artifacts(&self, document: &CircuitDocument) -> Result<ArtifactSet> {
        let mut artifacts = ArtifactSet::new();

        info!("Generating Gerber layers...");
        for (layer, content) in self.converters.gerber.layers(document)? {
            debug!("Layer {} has {} bytes", layer, content.len());
            artifacts.insert(Artifact::new(layer, ArtifactKind::Gerber, content));
        }

        info!("Generating drill files...");
        for (name, plated) in [(PLATED_DRILL, true), (UNPLATED_DRILL, false)] {
            match self.converters.drill.drill(document, plated)? {
                Some(content) => artifacts.insert(Artifact::new(name, ArtifactKind::Drill, content)),
                None => debug!("No {} holes, skipping {}.drl", name, name),
            }
        }

        info!("Generating BOM...");
        let rows = self.converters.bom.rows(document)?;
        let bom = self.converters.bom.to_csv(&rows)?;
        artifacts.insert(Artifact::new("bom", ArtifactKind::Csv, bom));

        info!("Generating pick and place file...");
        let pnp = self.converters.pnp.csv(document)?;
        artifacts.insert(Artifact::new("pnp", ArtifactKind::Csv, pnp));

        info!("Generated {} artifacts", artifacts.len());
        Ok(artifacts)
    }
}

/// Summary of a finished packaging run
#[derive(Debug)]
pub struct ConversionStats {
    pub total_files: usize,
    pub file_names: Vec<String>,
    pub zip_path: PathBuf,
}
