//! Excellon drill file generation

use super::{format_number, DrillConverter};
use crate::circuit::{CircuitDocument, PcbHole, PcbPlatedHole, PcbVia};
use crate::error::Result;
use std::fmt::Write;
use tracing::debug;

/// A hit of a given diameter at (x, y), all in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrillHit {
    pub diameter: f64,
    pub x: f64,
    pub y: f64,
}

/// Built-in [`DrillConverter`]
#[derive(Debug, Clone, Default)]
pub struct ExcellonWriter {
    stamp: Option<String>,
}

impl ExcellonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed header timestamp instead of the current time
    pub fn with_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.stamp = Some(stamp.into());
        self
    }

    /// Plated hits are plated holes and vias, unplated hits are bare holes
    pub fn hits(doc: &CircuitDocument, plated: bool) -> Result<Vec<DrillHit>> {
        let mut hits = Vec::new();
        if plated {
            for hole in doc.typed::<PcbPlatedHole>("pcb_plated_hole")? {
                hits.push(DrillHit {
                    diameter: hole.drill_diameter(),
                    x: hole.x,
                    y: hole.y,
                });
            }
            for via in doc.typed::<PcbVia>("pcb_via")? {
                hits.push(DrillHit {
                    diameter: via.hole_diameter,
                    x: via.x,
                    y: via.y,
                });
            }
        } else {
            for hole in doc.typed::<PcbHole>("pcb_hole")? {
                hits.push(DrillHit {
                    diameter: hole.diameter(),
                    x: hole.x,
                    y: hole.y,
                });
            }
        }
        hits.retain(|hit| hit.diameter > 0.0);
        Ok(hits)
    }

    /// Render hits as an Excellon program, one tool per distinct diameter
    pub fn render(&self, hits: &[DrillHit], plated: bool) -> String {
        // diameters rounded to the micron share a tool
        let mut tools: Vec<i64> = hits
            .iter()
            .map(|hit| (hit.diameter * 1000.0).round() as i64)
            .collect();
        tools.sort_unstable();
        tools.dedup();

        let stamp = self
            .stamp
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());

        let mut out = String::new();
        out.push_str("M48\n");
        let _ = writeln!(out, "; Generated by tscircuit-fab {}, {}", env!("CARGO_PKG_VERSION"), stamp);
        let _ = writeln!(out, "; TYPE={}", if plated { "PLATED" } else { "NON_PLATED" });
        out.push_str("FMAT,2\n");
        out.push_str("METRIC\n");
        for (index, microns) in tools.iter().enumerate() {
            let _ = writeln!(out, "T{}C{:.3}", index + 1, *microns as f64 / 1000.0);
        }
        out.push_str("%\n");
        out.push_str("G90\n");
        out.push_str("G05\n");
        for (index, microns) in tools.iter().enumerate() {
            let _ = writeln!(out, "T{}", index + 1);
            for hit in hits
                .iter()
                .filter(|hit| (hit.diameter * 1000.0).round() as i64 == *microns)
            {
                let _ = writeln!(
                    out,
                    "X{}Y{}",
                    format_number(hit.x, 4),
                    format_number(hit.y, 4)
                );
            }
        }
        out.push_str("T0\n");
        out.push_str("M30\n");
        out
    }
}

impl DrillConverter for ExcellonWriter {
    fn drill(&self, doc: &CircuitDocument, plated: bool) -> Result<Option<String>> {
        let hits = Self::hits(doc, plated)?;
        debug!("{} {} drill hits", hits.len(), if plated { "plated" } else { "unplated" });
        if hits.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.render(&hits, plated)))
    }
}
