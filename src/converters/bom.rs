//! Bill of materials

use super::{csv, format_number, BomConverter};
use crate::circuit::{CadComponent, CircuitDocument, SourceComponent};
use crate::error::Result;
use std::collections::HashMap;

/// Column names of the BOM CSV, in order
pub const BOM_COLUMNS: [&str; 6] = [
    "Designator",
    "Comment",
    "Value",
    "Footprint",
    "JLCPCB Part #",
    "Manufacturer Part #",
];

/// One BOM line per source component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BomRow {
    pub designator: String,
    pub comment: String,
    pub value: String,
    pub footprint: String,
    pub supplier_part_number: String,
    pub manufacturer_part_number: String,
}

impl BomRow {
    fn fields(&self) -> Vec<&str> {
        vec![
            self.designator.as_str(),
            self.comment.as_str(),
            self.value.as_str(),
            self.footprint.as_str(),
            self.supplier_part_number.as_str(),
            self.manufacturer_part_number.as_str(),
        ]
    }
}

/// Format a value with an SI prefix, e.g. `4700, "Ω"` → `4.7kΩ`
pub fn si_value(value: f64, unit: &str) -> String {
    const PREFIXES: [(f64, &str); 8] = [
        (1e9, "G"),
        (1e6, "M"),
        (1e3, "k"),
        (1.0, ""),
        (1e-3, "m"),
        (1e-6, "µ"),
        (1e-9, "n"),
        (1e-12, "p"),
    ];
    if value == 0.0 {
        return format!("0{}", unit);
    }
    let magnitude = value.abs();
    let (scale, prefix) = PREFIXES
        .iter()
        .find(|(scale, _)| magnitude >= scale * 0.9995)
        .copied()
        .unwrap_or((1e-12, "p"));
    format!("{}{}{}", format_number(value / scale, 3), prefix, unit)
}

/// `simple_resistor` → `Resistor`
fn comment_for(ftype: Option<&str>) -> String {
    let Some(ftype) = ftype else {
        return String::new();
    };
    let bare = ftype.strip_prefix("simple_").unwrap_or(ftype);
    bare.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn value_for(component: &SourceComponent) -> String {
    if let Some(display) = &component.display_value {
        return display.clone();
    }
    if let Some(r) = component.resistance {
        return si_value(r, "Ω");
    }
    if let Some(c) = component.capacitance {
        return si_value(c, "F");
    }
    if let Some(l) = component.inductance {
        return si_value(l, "H");
    }
    if let Some(f) = component.frequency {
        return si_value(f, "Hz");
    }
    String::new()
}

/// Built-in [`BomConverter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BomBuilder;

impl BomConverter for BomBuilder {
    fn rows(&self, doc: &CircuitDocument) -> Result<Vec<BomRow>> {
        let footprints: HashMap<String, String> = doc
            .typed::<CadComponent>("cad_component")?
            .into_iter()
            .filter_map(|cad| Some((cad.source_component_id, cad.footprinter_string?)))
            .collect();

        let rows = doc
            .typed::<SourceComponent>("source_component")?
            .into_iter()
            .map(|component| BomRow {
                designator: component.name.clone(),
                comment: comment_for(component.ftype.as_deref()),
                value: value_for(&component),
                footprint: footprints
                    .get(&component.source_component_id)
                    .cloned()
                    .unwrap_or_default(),
                supplier_part_number: component
                    .supplier_part_numbers
                    .as_ref()
                    .and_then(|numbers| numbers.get("jlcpcb"))
                    .and_then(|numbers| numbers.first())
                    .cloned()
                    .unwrap_or_default(),
                manufacturer_part_number: component
                    .manufacturer_part_number
                    .clone()
                    .unwrap_or_default(),
            })
            .collect();

        Ok(rows)
    }

    fn to_csv(&self, rows: &[BomRow]) -> Result<String> {
        let records: Vec<Vec<&str>> = rows.iter().map(BomRow::fields).collect();
        Ok(csv::write_table(&BOM_COLUMNS, &records))
    }
}
