//! Format converters
//!
//! Each artifact kind is produced through its own capability trait so the
//! pipelines only depend on the interface. The crate ships a basic
//! implementation of each one; [`Converters::builtin`] bundles them.

pub mod bom;
pub mod component;
pub mod csv;
pub mod drill;
pub mod gerber;
pub mod pnp;
pub mod svg;

use crate::circuit::CircuitDocument;
use crate::easyeda::PartRecord;
use crate::error::Result;
use std::collections::BTreeMap;

pub use bom::BomRow;

/// Circuit document to Gerber layers, keyed by layer name
pub trait GerberConverter {
    fn layers(&self, doc: &CircuitDocument) -> Result<BTreeMap<String, String>>;
}

/// Circuit document to Excellon drill data; `None` when there is nothing to drill
pub trait DrillConverter {
    fn drill(&self, doc: &CircuitDocument, plated: bool) -> Result<Option<String>>;
}

/// Circuit document to bill-of-materials rows and their CSV rendering
pub trait BomConverter {
    fn rows(&self, doc: &CircuitDocument) -> Result<Vec<BomRow>>;
    fn to_csv(&self, rows: &[BomRow]) -> Result<String>;
}

/// Circuit document to pick-and-place CSV
pub trait PnpConverter {
    fn csv(&self, doc: &CircuitDocument) -> Result<String>;
}

/// Options of the PCB render
#[derive(Debug, Clone, PartialEq)]
pub struct PcbSvgOptions {
    /// Size the canvas after the board instead of a fixed 4:3 frame
    pub match_board_aspect_ratio: bool,
    pub background_color: String,
}

impl Default for PcbSvgOptions {
    fn default() -> Self {
        Self {
            match_board_aspect_ratio: true,
            background_color: crate::config::DEFAULT_BACKGROUND.to_string(),
        }
    }
}

/// Circuit document to SVG images
pub trait SvgConverter {
    fn pcb_svg(&self, doc: &CircuitDocument, options: &PcbSvgOptions) -> Result<String>;
    fn schematic_svg(&self, doc: &CircuitDocument) -> Result<String>;
}

/// EasyEDA part record to tscircuit component source
pub trait ComponentConverter {
    fn source(&self, part: &PartRecord) -> Result<String>;
}

/// Converters used by the packaging pipeline
pub struct Converters {
    pub gerber: Box<dyn GerberConverter>,
    pub drill: Box<dyn DrillConverter>,
    pub bom: Box<dyn BomConverter>,
    pub pnp: Box<dyn PnpConverter>,
}

impl Converters {
    /// The converters shipped with this crate
    pub fn builtin() -> Self {
        Self {
            gerber: Box::new(gerber::GerberWriter::new()),
            drill: Box::new(drill::ExcellonWriter::new()),
            bom: Box::new(bom::BomBuilder),
            pnp: Box::new(pnp::PnpBuilder),
        }
    }
}

/// Format a millimeter value without trailing zeros
pub(crate) fn format_number(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}
