//! Circuit document access
//!
//! The circuit document is produced by the exporter and treated as opaque JSON.
//! Converters that need structure pull typed views of individual elements out of
//! it by their `type` tag; fields they do not care about are ignored and missing
//! optional fields fall back to defaults.

use crate::error::{FabError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Complete electronic design as exported by `tsci export -f circuit-json`
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitDocument(Value);

impl CircuitDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse a document; the only requirement is that it is valid JSON
    pub fn from_json(text: &str) -> Result<Self> {
        let value = serde_json::from_str(text)
            .map_err(|e| FabError::conversion("circuit JSON", e))?;
        Ok(Self(value))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FabError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// All elements; an empty iterator if the document is not an array
    pub fn elements(&self) -> impl Iterator<Item = &Value> {
        self.0.as_array().into_iter().flatten()
    }

    /// Raw elements whose `type` equals `kind`
    pub fn elements_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.elements()
            .filter(move |element| element.get("type").and_then(Value::as_str) == Some(kind))
    }

    /// Typed view of every element of `kind`
    pub fn typed<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>> {
        self.elements_of(kind)
            .map(|element| {
                serde_json::from_value(element.clone())
                    .map_err(|e| FabError::conversion(kind, e).into())
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Size {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// Copper side an element sits on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Top,
    Bottom,
    #[serde(other)]
    Inner,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Inner => "inner",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PcbBoard {
    #[serde(default)]
    pub center: Point,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub outline: Option<Vec<Point>>,
}

impl PcbBoard {
    /// Closed outline polygon, the rectangle from center/size when no outline is given
    pub fn polygon(&self) -> Vec<Point> {
        if let Some(outline) = self.outline.as_ref().filter(|o| o.len() >= 3) {
            return outline.clone();
        }
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let Point { x, y } = self.center;
        vec![
            Point { x: x - hw, y: y - hh },
            Point { x: x + hw, y: y - hh },
            Point { x: x + hw, y: y + hh },
            Point { x: x - hw, y: y + hh },
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PcbSmtPad {
    #[serde(default)]
    pub shape: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub layer: Side,
}

impl PcbSmtPad {
    pub fn is_circle(&self) -> bool {
        self.shape == "circle"
    }

    /// Bounding size of the pad
    pub fn size(&self) -> Size {
        if self.is_circle() {
            Size {
                width: self.radius * 2.0,
                height: self.radius * 2.0,
            }
        } else {
            Size {
                width: self.width,
                height: self.height,
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PcbPlatedHole {
    #[serde(default)]
    pub shape: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub hole_diameter: Option<f64>,
    #[serde(default)]
    pub outer_diameter: Option<f64>,
    #[serde(default)]
    pub hole_width: Option<f64>,
    #[serde(default)]
    pub hole_height: Option<f64>,
    #[serde(default)]
    pub outer_width: Option<f64>,
    #[serde(default)]
    pub outer_height: Option<f64>,
    #[serde(default)]
    pub rect_pad_width: Option<f64>,
    #[serde(default)]
    pub rect_pad_height: Option<f64>,
}

impl PcbPlatedHole {
    /// Drill diameter; oval and pill holes are drilled with their smaller dimension
    pub fn drill_diameter(&self) -> f64 {
        self.hole_diameter
            .or_else(|| match (self.hole_width, self.hole_height) {
                (Some(w), Some(h)) => Some(w.min(h)),
                (Some(w), None) => Some(w),
                (None, Some(h)) => Some(h),
                (None, None) => None,
            })
            .unwrap_or(0.0)
    }

    /// Copper annulus size
    pub fn pad_size(&self) -> Size {
        if let Some(d) = self.outer_diameter {
            return Size {
                width: d,
                height: d,
            };
        }
        if let (Some(w), Some(h)) = (self.rect_pad_width, self.rect_pad_height) {
            return Size {
                width: w,
                height: h,
            };
        }
        Size {
            width: self.outer_width.unwrap_or_else(|| self.drill_diameter()),
            height: self.outer_height.unwrap_or_else(|| self.drill_diameter()),
        }
    }

    pub fn is_round(&self) -> bool {
        self.outer_diameter.is_some() || self.shape == "circle"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PcbHole {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub hole_diameter: Option<f64>,
    #[serde(default)]
    pub hole_width: Option<f64>,
    #[serde(default)]
    pub hole_height: Option<f64>,
}

impl PcbHole {
    pub fn diameter(&self) -> f64 {
        self.hole_diameter
            .or_else(|| match (self.hole_width, self.hole_height) {
                (Some(w), Some(h)) => Some(w.min(h)),
                (w, h) => w.or(h),
            })
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PcbVia {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub outer_diameter: f64,
    #[serde(default)]
    pub hole_diameter: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutePoint {
    #[serde(default)]
    pub route_type: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub layer: Option<Side>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PcbTrace {
    #[serde(default)]
    pub route: Vec<RoutePoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PcbSilkscreenPath {
    #[serde(default)]
    pub layer: Side,
    #[serde(default)]
    pub route: Vec<Point>,
    #[serde(default)]
    pub stroke_width: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PcbComponent {
    #[serde(default)]
    pub pcb_component_id: String,
    #[serde(default)]
    pub source_component_id: String,
    #[serde(default)]
    pub center: Point,
    #[serde(default)]
    pub layer: Side,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceComponent {
    #[serde(default)]
    pub source_component_id: String,
    #[serde(default)]
    pub ftype: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_value: Option<String>,
    #[serde(default)]
    pub resistance: Option<f64>,
    #[serde(default)]
    pub capacitance: Option<f64>,
    #[serde(default)]
    pub inductance: Option<f64>,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub manufacturer_part_number: Option<String>,
    #[serde(default)]
    pub supplier_part_numbers: Option<std::collections::BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CadComponent {
    #[serde(default)]
    pub source_component_id: String,
    #[serde(default)]
    pub footprinter_string: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchematicComponent {
    #[serde(default)]
    pub source_component_id: String,
    #[serde(default)]
    pub center: Point,
    #[serde(default)]
    pub size: Size,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchematicPort {
    #[serde(default)]
    pub center: Point,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchematicEdge {
    #[serde(default)]
    pub from: Point,
    #[serde(default)]
    pub to: Point,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchematicTrace {
    #[serde(default)]
    pub edges: Vec<SchematicEdge>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchematicText {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub position: Point,
}

/// Axis-aligned bounds in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn padded(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_invalid_json() {
        assert!(CircuitDocument::from_json("{ not json").is_err());
    }

    #[test]
    fn test_accepts_any_json() {
        let doc = CircuitDocument::from_json(r#"{"hello": "world"}"#).unwrap();
        assert_eq!(doc.elements().count(), 0);
    }

    #[test]
    fn test_typed_filters_by_kind() {
        let doc = CircuitDocument::new(json!([
            { "type": "pcb_smtpad", "shape": "rect", "x": 1.0, "y": 2.0, "width": 0.5, "height": 0.6, "layer": "bottom" },
            { "type": "pcb_hole", "x": 0.0, "y": 0.0, "hole_diameter": 1.0 },
            { "type": "pcb_smtpad", "shape": "circle", "x": 0.0, "y": 0.0, "radius": 0.3 }
        ]));

        let pads: Vec<PcbSmtPad> = doc.typed("pcb_smtpad").unwrap();
        assert_eq!(pads.len(), 2);
        assert_eq!(pads[0].layer, Side::Bottom);
        assert_eq!(pads[1].layer, Side::Top);
        assert_eq!(pads[1].size().width, 0.6);
    }

    #[test]
    fn test_board_polygon_from_size() {
        let board = PcbBoard {
            center: Point { x: 0.0, y: 0.0 },
            width: 10.0,
            height: 4.0,
            outline: None,
        };
        let polygon = board.polygon();
        assert_eq!(polygon.len(), 4);
        assert_eq!(polygon[0], Point { x: -5.0, y: -2.0 });
        assert_eq!(polygon[2], Point { x: 5.0, y: 2.0 });
    }

    #[test]
    fn test_pill_hole_uses_smaller_dimension() {
        let hole = PcbPlatedHole {
            shape: "pill".to_string(),
            hole_width: Some(0.6),
            hole_height: Some(1.2),
            ..Default::default()
        };
        assert_eq!(hole.drill_diameter(), 0.6);
    }
}
