//! Pick-and-place table

use super::{csv, format_number, PnpConverter};
use crate::circuit::{CircuitDocument, PcbComponent, Side, SourceComponent};
use crate::error::Result;
use std::collections::HashMap;

pub const PNP_COLUMNS: [&str; 5] = ["Designator", "Mid X", "Mid Y", "Layer", "Rotation"];

/// Built-in [`PnpConverter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PnpBuilder;

impl PnpConverter for PnpBuilder {
    fn csv(&self, doc: &CircuitDocument) -> Result<String> {
        let names: HashMap<String, String> = doc
            .typed::<SourceComponent>("source_component")?
            .into_iter()
            .map(|component| (component.source_component_id, component.name))
            .collect();

        let rows: Vec<Vec<String>> = doc
            .typed::<PcbComponent>("pcb_component")?
            .into_iter()
            .map(|component| {
                let designator = names
                    .get(&component.source_component_id)
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .unwrap_or_else(|| component.pcb_component_id.clone());
                let layer = match component.layer {
                    Side::Bottom => "Bottom",
                    _ => "Top",
                };
                vec![
                    designator,
                    format!("{}mm", format_number(component.center.x, 4)),
                    format!("{}mm", format_number(component.center.y, 4)),
                    layer.to_string(),
                    format_number(component.rotation.rem_euclid(360.0), 2),
                ]
            })
            .collect();

        Ok(csv::write_table(&PNP_COLUMNS, &rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_use_source_names() {
        let doc = CircuitDocument::new(json!([
            { "type": "source_component", "source_component_id": "sc1", "name": "R1" },
            { "type": "pcb_component", "pcb_component_id": "pc1", "source_component_id": "sc1",
              "center": { "x": 1.5, "y": -2 }, "layer": "bottom", "rotation": -90 },
            { "type": "pcb_component", "pcb_component_id": "pc2", "source_component_id": "missing",
              "center": { "x": 0, "y": 0 }, "layer": "top", "rotation": 0 }
        ]));

        let text = PnpBuilder.csv(&doc).unwrap();
        let records = csv::parse(&text);

        assert_eq!(records[0], PNP_COLUMNS);
        assert_eq!(records[1], ["R1", "1.5mm", "-2mm", "Bottom", "270"]);
        assert_eq!(records[2][0], "pc2");
        assert_eq!(records[2][3], "Top");
    }
}
