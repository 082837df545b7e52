//! easyeda-import - generate a tscircuit component from an EasyEDA part

use tracing::error;
use tscircuit_fab::{EasyEdaImporter, ImportConfig};

fn main() {
    let config = ImportConfig::from_args().unwrap_or_else(|e| {
        eprintln!("{:#}", e);
        std::process::exit(1);
    });

    let result = EasyEdaImporter::http(&config.api_url)
        .and_then(|importer| importer.import(&config.part_number, &config.output_dir));

    if let Err(e) = result {
        error!("Import failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
