//! tscircuit-fab - fabrication outputs for tscircuit projects
//!
//! Three pipelines share one shape: export the project to a circuit document,
//! run converters over it and write the results.
//!
//! - [`package::Packager`] produces Gerber, drill, BOM and pick-and-place files
//!   packed into `output.zip`.
//! - [`render::SvgRenderPipeline`] writes a PCB or schematic SVG.
//! - [`importer::EasyEdaImporter`] turns an EasyEDA part into a `.tsx` component.

pub mod archive;
pub mod circuit;
pub mod config;
pub mod converters;
pub mod easyeda;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod output;
pub mod package;
pub mod progress;
pub mod render;
pub mod temp;

pub use config::{ImportConfig, PackageConfig, SvgConfig};
pub use error::{FabError, Result};
pub use importer::EasyEdaImporter;
pub use package::Packager;
pub use render::SvgRenderPipeline;
