//! Gerber layer generation
//!
//! Each layer is collected as a list of `gerber_types` commands and serialized
//! through `GerberCode`: millimeters, 4.6 coordinate format, aperture table
//! ahead of the body.

use super::GerberConverter;
use crate::circuit::{
    CircuitDocument, PcbBoard, PcbPlatedHole, PcbSilkscreenPath, PcbSmtPad, PcbTrace, PcbVia,
    Point, Side,
};
use crate::error::{FabError, Result};
use gerber_types::{
    Aperture, ApertureDefinition, Circle, Command, CommentContent, CoordinateFormat,
    CoordinateNumber, Coordinates, DCode, GCode, GerberCode, InterpolationMode, MCode, Operation,
    Polarity, Rectangular, Unit,
};
use std::collections::BTreeMap;
use tracing::debug;

/// First D-code available for user apertures
const FIRST_APERTURE: i32 = 10;

/// Line width of the board outline
const OUTLINE_WIDTH: f64 = 0.1;

/// Trace width when the route does not carry one
const DEFAULT_TRACE_WIDTH: f64 = 0.15;

/// Default silkscreen stroke
const DEFAULT_SILK_WIDTH: f64 = 0.1;

/// Mm to 4.6 fixed-point integer
fn coord(value: f64) -> i64 {
    (value * 1_000_000.0).round() as i64
}

/// Aperture sizes are kept to whole micrometers
fn micron(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn circle(diameter: f64) -> Aperture {
    Aperture::Circle(Circle::new(micron(diameter)))
}

fn rectangle(width: f64, height: f64) -> Aperture {
    Aperture::Rectangle(Rectangular::new(micron(width), micron(height)))
}

fn obround(width: f64, height: f64) -> Aperture {
    Aperture::Obround(Rectangular::new(micron(width), micron(height)))
}

/// Single Gerber file under construction
#[derive(Debug)]
pub struct GerberLayer {
    format: CoordinateFormat,
    apertures: Vec<Aperture>,
    body: Vec<Command>,
    current: Option<i32>,
    operations: usize,
}

impl Default for GerberLayer {
    fn default() -> Self {
        Self {
            format: CoordinateFormat::new(4, 6),
            apertures: Vec::new(),
            body: Vec::new(),
            current: None,
            operations: 0,
        }
    }
}

impl GerberLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&mut self, aperture: Aperture) {
        let code = match self.apertures.iter().position(|a| *a == aperture) {
            Some(index) => FIRST_APERTURE + index as i32,
            None => {
                self.apertures.push(aperture);
                FIRST_APERTURE + self.apertures.len() as i32 - 1
            }
        };
        if self.current != Some(code) {
            self.body.push(DCode::SelectAperture(code).into());
            self.current = Some(code);
        }
    }

    fn at(&self, x: f64, y: f64) -> Option<Coordinates> {
        Some(Coordinates::new(
            CoordinateNumber::new(coord(x)),
            CoordinateNumber::new(coord(y)),
            self.format,
        ))
    }

    /// Flash `aperture` at (x, y)
    pub fn flash(&mut self, aperture: Aperture, x: f64, y: f64) {
        self.select(aperture);
        let operation = Operation::Flash(self.at(x, y));
        self.body.push(DCode::Operation(operation).into());
        self.operations += 1;
    }

    /// Stroke a polyline with a round aperture of `width`
    pub fn polyline(&mut self, points: &[Point], width: f64) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        if rest.is_empty() {
            return;
        }
        self.select(circle(width));
        let start = Operation::Move(self.at(first.x, first.y));
        self.body.push(DCode::Operation(start).into());
        for point in rest {
            let segment = Operation::Interpolate(self.at(point.x, point.y), None);
            self.body.push(DCode::Operation(segment).into());
        }
        self.operations += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.operations == 0
    }

    /// Full command list; `name` and `stamp` go into the leading comments
    pub fn commands(&self, name: &str, stamp: &str) -> Vec<Command> {
        let mut commands: Vec<Command> = vec![
            GCode::Comment(CommentContent::String(format!("Layer: {}", name))).into(),
            GCode::Comment(CommentContent::String(format!(
                "Generated by tscircuit-fab {}, {}",
                env!("CARGO_PKG_VERSION"),
                stamp
            )))
            .into(),
            self.format.into(),
            Unit::Millimeters.into(),
            Polarity::Dark.into(),
        ];
        for (index, aperture) in self.apertures.iter().enumerate() {
            let code = FIRST_APERTURE + index as i32;
            commands.push(ApertureDefinition::new(code, aperture.clone()).into());
        }
        commands.push(GCode::InterpolationMode(InterpolationMode::Linear).into());
        commands.extend(self.body.iter().cloned());
        commands.push(MCode::EndOfFile.into());
        commands
    }

    /// Serialize the layer to RS-274X text
    pub fn finish(&self, name: &str, stamp: &str) -> Result<String> {
        let mut out = Vec::new();
        self.commands(name, stamp)
            .serialize(&mut out)
            .map_err(|e| FabError::conversion("Gerber", format!("{}: {}", name, e)))?;
        String::from_utf8(out).map_err(|e| FabError::conversion("Gerber", e).into())
    }
}

/// Built-in [`GerberConverter`]
#[derive(Debug, Clone)]
pub struct GerberWriter {
    /// Clearance added around pads on the solder mask layers
    mask_expansion: f64,

    /// Fixed timestamp for reproducible output
    stamp: Option<String>,
}

impl Default for GerberWriter {
    fn default() -> Self {
        Self {
            mask_expansion: 0.05,
            stamp: None,
        }
    }
}

impl GerberWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the solder mask expansion in millimeters
    pub fn with_mask_expansion(mut self, expansion: f64) -> Self {
        self.mask_expansion = expansion;
        self
    }

    /// Use a fixed header timestamp instead of the current time
    pub fn with_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.stamp = Some(stamp.into());
        self
    }

    fn stamp(&self) -> String {
        self.stamp
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

fn pad_aperture(pad: &PcbSmtPad, grow: f64) -> Aperture {
    let size = pad.size();
    if pad.is_circle() {
        circle(size.width + grow * 2.0)
    } else if pad.shape == "pill" {
        obround(size.width + grow * 2.0, size.height + grow * 2.0)
    } else {
        rectangle(size.width + grow * 2.0, size.height + grow * 2.0)
    }
}

fn plated_hole_aperture(hole: &PcbPlatedHole, grow: f64) -> Aperture {
    let size = hole.pad_size();
    if hole.is_round() {
        circle(size.width + grow * 2.0)
    } else if hole.shape == "circular_hole_with_rect_pad" {
        rectangle(size.width + grow * 2.0, size.height + grow * 2.0)
    } else {
        obround(size.width + grow * 2.0, size.height + grow * 2.0)
    }
}

/// Split trace routes into per-side polylines, breaking at vias and layer changes
fn trace_runs(traces: &[PcbTrace]) -> Vec<(Side, f64, Vec<Point>)> {
    let mut runs = Vec::new();
    for trace in traces {
        let mut current: Option<(Side, f64, Vec<Point>)> = None;
        for point in &trace.route {
            if point.route_type != "wire" {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
                continue;
            }
            let side = point.layer.unwrap_or_default();
            let width = point.width.unwrap_or(DEFAULT_TRACE_WIDTH);
            let p = Point {
                x: point.x,
                y: point.y,
            };
            match current.as_mut() {
                Some((s, _, points)) if *s == side => {
                    points.push(p);
                    continue;
                }
                _ => {}
            }
            if let Some(run) = current.replace((side, width, vec![p])) {
                runs.push(run);
            }
        }
        if let Some(run) = current {
            runs.push(run);
        }
    }
    runs.retain(|(_, _, points)| points.len() >= 2);
    runs
}

impl GerberConverter for GerberWriter {
    fn layers(&self, doc: &CircuitDocument) -> Result<BTreeMap<String, String>> {
        let boards: Vec<PcbBoard> = doc.typed("pcb_board")?;
        let pads: Vec<PcbSmtPad> = doc.typed("pcb_smtpad")?;
        let plated: Vec<PcbPlatedHole> = doc.typed("pcb_plated_hole")?;
        let vias: Vec<PcbVia> = doc.typed("pcb_via")?;
        let traces: Vec<PcbTrace> = doc.typed("pcb_trace")?;
        let silk: Vec<PcbSilkscreenPath> = doc.typed("pcb_silkscreen_path")?;

        let stamp = self.stamp();
        let runs = trace_runs(&traces);
        let mut layers = BTreeMap::new();

        for (side, prefix) in [(Side::Top, "F"), (Side::Bottom, "B")] {
            let mut copper = GerberLayer::new();
            let mut mask = GerberLayer::new();
            let mut paste = GerberLayer::new();
            let mut silkscreen = GerberLayer::new();

            for pad in pads.iter().filter(|p| p.layer == side) {
                copper.flash(pad_aperture(pad, 0.0), pad.x, pad.y);
                mask.flash(pad_aperture(pad, self.mask_expansion), pad.x, pad.y);
                paste.flash(pad_aperture(pad, 0.0), pad.x, pad.y);
            }
            for hole in &plated {
                copper.flash(plated_hole_aperture(hole, 0.0), hole.x, hole.y);
                mask.flash(plated_hole_aperture(hole, self.mask_expansion), hole.x, hole.y);
            }
            for via in &vias {
                copper.flash(circle(via.outer_diameter), via.x, via.y);
            }
            for (run_side, width, points) in &runs {
                if *run_side == side {
                    copper.polyline(points, *width);
                }
            }
            for path in silk.iter().filter(|p| p.layer == side) {
                silkscreen.polyline(&path.route, path.stroke_width.unwrap_or(DEFAULT_SILK_WIDTH));
            }

            let copper_name = format!("{}_Cu", prefix);
            let mask_name = format!("{}_Mask", prefix);
            let paste_name = format!("{}_Paste", prefix);
            let silk_name = format!("{}_SilkScreen", prefix);

            layers.insert(copper_name.clone(), copper.finish(&copper_name, &stamp)?);
            layers.insert(mask_name.clone(), mask.finish(&mask_name, &stamp)?);
            if !paste.is_empty() {
                layers.insert(paste_name.clone(), paste.finish(&paste_name, &stamp)?);
            }
            if !silkscreen.is_empty() {
                layers.insert(silk_name.clone(), silkscreen.finish(&silk_name, &stamp)?);
            }
        }

        if !boards.is_empty() {
            let mut outline = GerberLayer::new();
            for board in &boards {
                let mut polygon = board.polygon();
                if let Some(first) = polygon.first().copied() {
                    polygon.push(first);
                }
                outline.polyline(&polygon, OUTLINE_WIDTH);
            }
            layers.insert("Edge_Cuts".to_string(), outline.finish("Edge_Cuts", &stamp)?);
        }

        debug!("Generated {} Gerber layers", layers.len());
        Ok(layers)
    }
}
