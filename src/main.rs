//! tscircuit-fab - package a tscircuit project into `output.zip`

use tracing::{error, info};
use tscircuit_fab::{PackageConfig, Packager};

fn main() {
    // Parse configuration and initialize logging
    let config = PackageConfig::from_args().unwrap_or_else(|e| {
        eprintln!("{:#}", e);
        std::process::exit(1);
    });

    let result = {
        let packager = Packager::system(config);
        packager.run()
    };

    match result {
        Ok(stats) => {
            info!("Packaged {} files", stats.total_files);
        }
        Err(e) => {
            error!("Packaging failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
