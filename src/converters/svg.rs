//! SVG renders of the PCB and schematic views

use super::{format_number, PcbSvgOptions, SvgConverter};
use crate::circuit::{
    Bounds, CircuitDocument, PcbBoard, PcbHole, PcbPlatedHole, PcbSilkscreenPath, PcbSmtPad,
    PcbTrace, PcbVia, Point, SchematicComponent, SchematicPort, SchematicTrace, SchematicText,
    Side,
};
use crate::error::{FabError, Result};
use xmlwriter::{Indent, Options, XmlWriter};

const SVG_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#;

/// Canvas width in pixels
const CANVAS_WIDTH: f64 = 800.0;

/// Canvas height when not following the board's aspect ratio
const FIXED_CANVAS_HEIGHT: f64 = 600.0;

/// Margin around the drawing in millimeters
const MARGIN_MM: f64 = 1.0;

const TOP_COPPER: &str = "rgb(200, 52, 52)";
const BOTTOM_COPPER: &str = "rgb(77, 127, 196)";
const HOLE_COLOR: &str = "#ff26e2";
const SILKSCREEN_COLOR: &str = "#f2eda1";
const BOARD_STROKE: &str = "rgba(255, 255, 255, 0.5)";

fn create_writer() -> XmlWriter {
    XmlWriter::new(Options {
        use_single_quote: false,
        indent: Indent::Spaces(2),
        attributes_indent: Indent::None,
    })
}

/// Millimeter space to canvas pixels, Y pointing down
#[derive(Debug, Clone, Copy)]
struct Projection {
    bounds: Bounds,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    fn fit(bounds: Bounds, width: f64, height: f64) -> Self {
        let scale = (width / bounds.width()).min(height / bounds.height());
        Self {
            bounds,
            scale,
            offset_x: (width - bounds.width() * scale) / 2.0,
            offset_y: (height - bounds.height() * scale) / 2.0,
        }
    }

    fn x(&self, x: f64) -> f64 {
        self.offset_x + (x - self.bounds.min_x) * self.scale
    }

    fn y(&self, y: f64) -> f64 {
        self.offset_y + (self.bounds.max_y - y) * self.scale
    }

    fn len(&self, value: f64) -> f64 {
        value * self.scale
    }

    fn path(&self, points: &[Point], close: bool) -> String {
        let mut d = String::new();
        for (index, point) in points.iter().enumerate() {
            d.push_str(if index == 0 { "M " } else { " L " });
            d.push_str(&format!("{} {}", px(self.x(point.x)), px(self.y(point.y))));
        }
        if close {
            d.push_str(" Z");
        }
        d
    }
}

fn px(value: f64) -> String {
    format_number(value, 3)
}

fn canvas_size(bounds: &Bounds, match_aspect: bool) -> (f64, f64) {
    if match_aspect {
        let height = (CANVAS_WIDTH * bounds.height() / bounds.width()).max(1.0);
        (CANVAS_WIDTH, height.round())
    } else {
        (CANVAS_WIDTH, FIXED_CANVAS_HEIGHT)
    }
}

fn start_svg(writer: &mut XmlWriter, width: f64, height: f64) {
    writer.start_element("svg");
    writer.write_attribute("xmlns", "http://www.w3.org/2000/svg");
    writer.write_attribute("width", &px(width));
    writer.write_attribute("height", &px(height));
    writer.write_attribute("viewBox", &format!("0 0 {} {}", px(width), px(height)));
}

fn copper_color(side: Side) -> &'static str {
    match side {
        Side::Bottom => BOTTOM_COPPER,
        _ => TOP_COPPER,
    }
}

struct PcbElements {
    boards: Vec<PcbBoard>,
    pads: Vec<PcbSmtPad>,
    plated: Vec<PcbPlatedHole>,
    holes: Vec<PcbHole>,
    vias: Vec<PcbVia>,
    traces: Vec<PcbTrace>,
    silk: Vec<PcbSilkscreenPath>,
}

impl PcbElements {
    fn load(doc: &CircuitDocument) -> Result<Self> {
        Ok(Self {
            boards: doc.typed("pcb_board")?,
            pads: doc.typed("pcb_smtpad")?,
            plated: doc.typed("pcb_plated_hole")?,
            holes: doc.typed("pcb_hole")?,
            vias: doc.typed("pcb_via")?,
            traces: doc.typed("pcb_trace")?,
            silk: doc.typed("pcb_silkscreen_path")?,
        })
    }

    /// Board outline bounds, or the extent of everything drawn when there is no board
    fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::empty();
        for board in &self.boards {
            for point in board.polygon() {
                bounds.include(point.x, point.y);
            }
        }
        if bounds.is_valid() {
            return bounds;
        }
        for pad in &self.pads {
            let size = pad.size();
            bounds.include(pad.x - size.width / 2.0, pad.y - size.height / 2.0);
            bounds.include(pad.x + size.width / 2.0, pad.y + size.height / 2.0);
        }
        for hole in &self.plated {
            bounds.include(hole.x, hole.y);
        }
        for hole in &self.holes {
            bounds.include(hole.x, hole.y);
        }
        for trace in &self.traces {
            for point in &trace.route {
                bounds.include(point.x, point.y);
            }
        }
        bounds
    }
}

/// Built-in [`SvgConverter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl SvgRenderer {
    fn draw_pad(writer: &mut XmlWriter, view: &Projection, pad: &PcbSmtPad) {
        let color = copper_color(pad.layer);
        if pad.is_circle() {
            writer.start_element("circle");
            writer.write_attribute("class", "pcb-pad");
            writer.write_attribute("cx", &px(view.x(pad.x)));
            writer.write_attribute("cy", &px(view.y(pad.y)));
            writer.write_attribute("r", &px(view.len(pad.radius)));
            writer.write_attribute("fill", color);
            writer.end_element();
        } else {
            writer.start_element("rect");
            writer.write_attribute("class", "pcb-pad");
            writer.write_attribute("x", &px(view.x(pad.x - pad.width / 2.0)));
            writer.write_attribute("y", &px(view.y(pad.y + pad.height / 2.0)));
            writer.write_attribute("width", &px(view.len(pad.width)));
            writer.write_attribute("height", &px(view.len(pad.height)));
            if pad.shape == "pill" {
                writer.write_attribute("rx", &px(view.len(pad.width.min(pad.height) / 2.0)));
            }
            writer.write_attribute("fill", color);
            writer.end_element();
        }
    }

    fn draw_ring(
        writer: &mut XmlWriter,
        view: &Projection,
        x: f64,
        y: f64,
        outer: f64,
        hole: f64,
        class: &str,
    ) {
        writer.start_element("g");
        writer.write_attribute("class", class);
        writer.start_element("circle");
        writer.write_attribute("cx", &px(view.x(x)));
        writer.write_attribute("cy", &px(view.y(y)));
        writer.write_attribute("r", &px(view.len(outer / 2.0)));
        writer.write_attribute("fill", TOP_COPPER);
        writer.end_element();
        writer.start_element("circle");
        writer.write_attribute("cx", &px(view.x(x)));
        writer.write_attribute("cy", &px(view.y(y)));
        writer.write_attribute("r", &px(view.len(hole / 2.0)));
        writer.write_attribute("fill", HOLE_COLOR);
        writer.end_element();
        writer.end_element();
    }

    fn draw_stroke(
        writer: &mut XmlWriter,
        view: &Projection,
        points: &[Point],
        width: f64,
        color: &str,
        class: &str,
    ) {
        if points.len() < 2 {
            return;
        }
        writer.start_element("path");
        writer.write_attribute("class", class);
        writer.write_attribute("d", &view.path(points, false));
        writer.write_attribute("fill", "none");
        writer.write_attribute("stroke", color);
        writer.write_attribute("stroke-width", &px(view.len(width)));
        writer.write_attribute("stroke-linecap", "round");
        writer.write_attribute("stroke-linejoin", "round");
        writer.end_element();
    }
}

impl SvgConverter for SvgRenderer {
    fn pcb_svg(&self, doc: &CircuitDocument, options: &PcbSvgOptions) -> Result<String> {
        let elements = PcbElements::load(doc)?;
        let bounds = elements.bounds();
        if !bounds.is_valid() || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(FabError::conversion("PCB SVG", "document has nothing to draw").into());
        }
        let bounds = bounds.padded(MARGIN_MM);
        let (width, height) = canvas_size(&bounds, options.match_board_aspect_ratio);
        let view = Projection::fit(bounds, width, height);

        let mut writer = create_writer();
        start_svg(&mut writer, width, height);

        writer.start_element("rect");
        writer.write_attribute("class", "boundary");
        writer.write_attribute("x", "0");
        writer.write_attribute("y", "0");
        writer.write_attribute("width", &px(width));
        writer.write_attribute("height", &px(height));
        writer.write_attribute("fill", &options.background_color);
        writer.end_element();

        for board in &elements.boards {
            writer.start_element("path");
            writer.write_attribute("class", "pcb-board");
            writer.write_attribute("d", &view.path(&board.polygon(), true));
            writer.write_attribute("fill", "none");
            writer.write_attribute("stroke", BOARD_STROKE);
            writer.write_attribute("stroke-width", &px(view.len(0.1)));
            writer.end_element();
        }

        // bottom copper first so the top side paints over it
        for side in [Side::Bottom, Side::Top] {
            for trace in &elements.traces {
                let mut run: Vec<Point> = Vec::new();
                let mut width = 0.15;
                for point in &trace.route {
                    let on_side =
                        point.route_type == "wire" && point.layer.unwrap_or_default() == side;
                    if on_side {
                        width = point.width.unwrap_or(width);
                        run.push(Point {
                            x: point.x,
                            y: point.y,
                        });
                    } else {
                        Self::draw_stroke(
                            &mut writer,
                            &view,
                            &run,
                            width,
                            copper_color(side),
                            "pcb-trace",
                        );
                        run.clear();
                    }
                }
                Self::draw_stroke(&mut writer, &view, &run, width, copper_color(side), "pcb-trace");
            }
            for pad in elements.pads.iter().filter(|p| p.layer == side) {
                Self::draw_pad(&mut writer, &view, pad);
            }
        }

        for hole in &elements.plated {
            let size = hole.pad_size();
            Self::draw_ring(
                &mut writer,
                &view,
                hole.x,
                hole.y,
                size.width.min(size.height),
                hole.drill_diameter(),
                "pcb-plated-hole",
            );
        }
        for via in &elements.vias {
            Self::draw_ring(
                &mut writer,
                &view,
                via.x,
                via.y,
                via.outer_diameter,
                via.hole_diameter,
                "pcb-via",
            );
        }
        for hole in &elements.holes {
            writer.start_element("circle");
            writer.write_attribute("class", "pcb-hole");
            writer.write_attribute("cx", &px(view.x(hole.x)));
            writer.write_attribute("cy", &px(view.y(hole.y)));
            writer.write_attribute("r", &px(view.len(hole.diameter() / 2.0)));
            writer.write_attribute("fill", HOLE_COLOR);
            writer.end_element();
        }
        for path in &elements.silk {
            Self::draw_stroke(
                &mut writer,
                &view,
                &path.route,
                path.stroke_width.unwrap_or(0.1),
                SILKSCREEN_COLOR,
                "pcb-silkscreen",
            );
        }

        let mut result = String::from(SVG_HEADER);
        result.push('\n');
        result.push_str(&writer.end_document());
        Ok(result)
    }

    fn schematic_svg(&self, doc: &CircuitDocument) -> Result<String> {
        let components: Vec<SchematicComponent> = doc.typed("schematic_component")?;
        let ports: Vec<SchematicPort> = doc.typed("schematic_port")?;
        let traces: Vec<SchematicTrace> = doc.typed("schematic_trace")?;
        let texts: Vec<SchematicText> = doc.typed("schematic_text")?;

        let mut bounds = Bounds::empty();
        for component in &components {
            let (hw, hh) = (component.size.width / 2.0, component.size.height / 2.0);
            bounds.include(component.center.x - hw, component.center.y - hh);
            bounds.include(component.center.x + hw, component.center.y + hh);
        }
        for port in &ports {
            bounds.include(port.center.x, port.center.y);
        }
        for edge in traces.iter().flat_map(|t| &t.edges) {
            bounds.include(edge.from.x, edge.from.y);
            bounds.include(edge.to.x, edge.to.y);
        }
        if !bounds.is_valid() {
            return Err(FabError::conversion("schematic SVG", "document has no schematic").into());
        }
        let bounds = bounds.padded(0.5);
        let (width, height) = (CANVAS_WIDTH, FIXED_CANVAS_HEIGHT);
        let view = Projection::fit(bounds, width, height);

        let mut writer = create_writer();
        start_svg(&mut writer, width, height);

        writer.start_element("rect");
        writer.write_attribute("class", "boundary");
        writer.write_attribute("x", "0");
        writer.write_attribute("y", "0");
        writer.write_attribute("width", &px(width));
        writer.write_attribute("height", &px(height));
        writer.write_attribute("fill", "rgb(245, 241, 237)");
        writer.end_element();

        for component in &components {
            writer.start_element("rect");
            writer.write_attribute("class", "component");
            writer.write_attribute(
                "x",
                &px(view.x(component.center.x - component.size.width / 2.0)),
            );
            writer.write_attribute(
                "y",
                &px(view.y(component.center.y + component.size.height / 2.0)),
            );
            writer.write_attribute("width", &px(view.len(component.size.width)));
            writer.write_attribute("height", &px(view.len(component.size.height)));
            writer.write_attribute("fill", "rgb(255, 255, 194)");
            writer.write_attribute("stroke", "rgb(132, 0, 0)");
            writer.write_attribute("stroke-width", "2");
            writer.end_element();
        }

        for edge in traces.iter().flat_map(|t| &t.edges) {
            writer.start_element("path");
            writer.write_attribute("class", "trace");
            writer.write_attribute("d", &view.path(&[edge.from, edge.to], false));
            writer.write_attribute("fill", "none");
            writer.write_attribute("stroke", "rgb(0, 150, 0)");
            writer.write_attribute("stroke-width", "2");
            writer.end_element();
        }

        for port in &ports {
            writer.start_element("circle");
            writer.write_attribute("class", "component-pin");
            writer.write_attribute("cx", &px(view.x(port.center.x)));
            writer.write_attribute("cy", &px(view.y(port.center.y)));
            writer.write_attribute("r", "3");
            writer.write_attribute("fill", "none");
            writer.write_attribute("stroke", "rgb(132, 0, 0)");
            writer.end_element();
        }

        for text in &texts {
            writer.start_element("text");
            writer.write_attribute("x", &px(view.x(text.position.x)));
            writer.write_attribute("y", &px(view.y(text.position.y)));
            writer.write_attribute("font-family", "sans-serif");
            writer.write_attribute("font-size", "14");
            writer.write_text(&text.text);
            writer.end_element();
        }

        let mut result = String::from(SVG_HEADER);
        result.push('\n');
        result.push_str(&writer.end_document());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn board_document() -> CircuitDocument {
        CircuitDocument::new(json!([
            { "type": "pcb_board", "center": { "x": 0, "y": 0 }, "width": 20, "height": 10 },
            { "type": "pcb_smtpad", "shape": "rect", "x": -2, "y": 0, "width": 1, "height": 0.6, "layer": "top" },
            { "type": "pcb_plated_hole", "shape": "circle", "x": 5, "y": 0, "hole_diameter": 1, "outer_diameter": 2 },
            { "type": "pcb_trace", "route": [
                { "route_type": "wire", "x": -2, "y": 0, "width": 0.2, "layer": "top" },
                { "route_type": "wire", "x": 5, "y": 0, "width": 0.2, "layer": "top" }
            ]}
        ]))
    }

    fn attribute(svg: &str, name: &str) -> String {
        let start = svg.find(&format!("{}=\"", name)).unwrap() + name.len() + 2;
        let end = svg[start..].find('"').unwrap() + start;
        svg[start..end].to_string()
    }

    #[test]
    fn test_pcb_follows_board_aspect_ratio() {
        let svg = SvgRenderer
            .pcb_svg(&board_document(), &PcbSvgOptions::default())
            .unwrap();

        // 22 x 12 mm after the margin
        assert_eq!(attribute(&svg, "width"), "800");
        assert_eq!(attribute(&svg, "height"), "436");
        assert!(svg.contains("fill=\"#1e1e1e\""));
        assert!(svg.contains("class=\"pcb-board\""));
        assert!(svg.contains("class=\"pcb-trace\""));
        assert!(svg.contains("class=\"pcb-plated-hole\""));
    }

    #[test]
    fn test_pcb_fixed_canvas_and_background() {
        let options = PcbSvgOptions {
            match_board_aspect_ratio: false,
            background_color: "white".to_string(),
        };
        let svg = SvgRenderer.pcb_svg(&board_document(), &options).unwrap();

        assert_eq!(attribute(&svg, "height"), "600");
        assert!(svg.contains("fill=\"white\""));
    }

    #[test]
    fn test_pcb_without_geometry_fails() {
        let result = SvgRenderer.pcb_svg(&CircuitDocument::new(json!([])), &PcbSvgOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_projection_flips_y() {
        let bounds = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 10.0,
            max_y: 10.0,
        };
        let view = Projection::fit(bounds, 100.0, 100.0);
        assert_eq!(view.y(10.0), 0.0);
        assert_eq!(view.y(0.0), 100.0);
        assert_eq!(view.x(5.0), 50.0);
    }

    #[test]
    fn test_schematic_draws_components_and_text() {
        let doc = CircuitDocument::new(json!([
            { "type": "schematic_component", "center": { "x": 0, "y": 0 }, "size": { "width": 1, "height": 0.4 } },
            { "type": "schematic_port", "center": { "x": -0.5, "y": 0 } },
            { "type": "schematic_trace", "edges": [ { "from": { "x": -0.5, "y": 0 }, "to": { "x": -2, "y": 0 } } ] },
            { "type": "schematic_text", "text": "R1 <1k>", "position": { "x": 0, "y": 0.5 } }
        ]));

        let svg = SvgRenderer.schematic_svg(&doc).unwrap();
        assert!(svg.contains("class=\"component\""));
        assert!(svg.contains("class=\"trace\""));
        assert!(svg.contains("R1 &lt;1k"));
    }
}
