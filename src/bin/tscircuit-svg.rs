//! tscircuit-svg - render a tscircuit project to an SVG file

use tracing::error;
use tscircuit_fab::{SvgConfig, SvgRenderPipeline};

fn main() {
    let config = SvgConfig::from_args().unwrap_or_else(|e| {
        eprintln!("{:#}", e);
        std::process::exit(1);
    });

    let result = SvgRenderPipeline::system(config).run();

    if let Err(e) = result {
        error!("Rendering failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
