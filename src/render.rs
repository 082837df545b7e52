//! SVG render pipeline
//!
//! Exports the project and writes a single SVG, PCB view by default or the
//! schematic with `--schematic`, exactly at the requested path.

use crate::{
    config::SvgConfig,
    converters::{svg::SvgRenderer, PcbSvgOptions, SvgConverter},
    error::{FabError, Result, ResultExt},
    exporter::{CommandRunner, Exporter, SystemCommandRunner},
};
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub struct SvgRenderPipeline<R: CommandRunner> {
    config: SvgConfig,
    exporter: Exporter<R>,
    converter: Box<dyn SvgConverter>,
}

impl SvgRenderPipeline<SystemCommandRunner> {
    pub fn system(config: SvgConfig) -> Self {
        let exporter = Exporter::system(config.exporter.clone());
        Self::new(config, exporter, Box::new(SvgRenderer))
    }
}

impl<R: CommandRunner> SvgRenderPipeline<R> {
    pub fn new(config: SvgConfig, exporter: Exporter<R>, converter: Box<dyn SvgConverter>) -> Self {
        Self {
            config,
            exporter,
            converter,
        }
    }

    fn options(&self) -> PcbSvgOptions {
        PcbSvgOptions {
            match_board_aspect_ratio: self.config.match_board_aspect_ratio,
            background_color: self.config.background.clone(),
        }
    }

    /// Render and write the SVG, returning the path written
    pub fn run(&self) -> Result<PathBuf> {
        let document = self
            .exporter
            .load_circuit_document(&self.config.entry, &self.config.work_dir)
            .with_path_context("export project", &self.config.entry)?;

        let svg = if self.config.schematic {
            info!("Rendering schematic SVG");
            self.converter
                .schematic_svg(&document)
                .with_artifact_context("schematic SVG")?
        } else {
            info!("Rendering PCB SVG");
            self.converter
                .pcb_svg(&document, &self.options())
                .with_artifact_context("PCB SVG")?
        };

        let output = self.config.output.clone();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FabError::io(parent, e))?;
        }
        fs::write(&output, svg).map_err(|e| FabError::io(&output, e))?;

        println!("SVG generated: {}", output.display());
        Ok(output)
    }
}
