//! EasyEDA part record to tscircuit component source (`.tsx`)

use super::ComponentConverter;
use crate::easyeda::PartRecord;
use crate::error::Result;
use serde_json::Value;
use std::fmt::Write;

/// A schematic pin of the part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub number: u32,
    pub label: String,
}

/// Read pins from the schematic shapes (`P~...` entries) of a record
pub fn pins(record: &PartRecord) -> Vec<Pin> {
    let Some(shapes) = record
        .raw()
        .pointer("/dataStr/shape")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut pins: Vec<Pin> = shapes
        .iter()
        .filter_map(Value::as_str)
        .filter(|shape| shape.starts_with("P~"))
        .enumerate()
        .map(|(index, shape)| {
            let segments: Vec<&str> = shape.split("^^").collect();
            let number = segments[0]
                .split('~')
                .nth(3)
                .and_then(|n| n.trim().parse::<u32>().ok())
                .unwrap_or(index as u32 + 1);
            let label = segments
                .get(3)
                .and_then(|segment| segment.split('~').nth(4))
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("pin{}", number));
            Pin { number, label }
        })
        .collect();

    pins.sort_by_key(|pin| pin.number);
    pins.dedup_by_key(|pin| pin.number);
    pins
}

/// Valid TypeScript identifier for a part name
pub fn identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// JS string literal
fn literal(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// Built-in [`ComponentConverter`] producing a `<chip />` component
#[derive(Debug, Clone, Copy, Default)]
pub struct TsxComponentWriter;

impl ComponentConverter for TsxComponentWriter {
    fn source(&self, part: &PartRecord) -> Result<String> {
        let pins = pins(part);
        let name = identifier(&part.name());

        let mut out = String::new();
        out.push_str("import type { ChipProps } from \"@tscircuit/props\"\n\n");

        out.push_str("const pinLabels = {\n");
        for pin in &pins {
            let _ = writeln!(out, "  pin{}: [{}],", pin.number, literal(&pin.label));
        }
        out.push_str("} as const\n\n");

        let _ = writeln!(
            out,
            "export const {} = (props: ChipProps<typeof pinLabels>) => {{",
            name
        );
        out.push_str("  return (\n");
        out.push_str("    <chip\n");
        out.push_str("      {...props}\n");
        out.push_str("      pinLabels={pinLabels}\n");
        if let Some(number) = part.lcsc_number() {
            out.push_str("      supplierPartNumbers={{\n");
            let _ = writeln!(out, "        jlcpcb: [{}],", literal(number));
            out.push_str("      }}\n");
        }
        let _ = writeln!(out, "      manufacturerPartNumber={{{}}}", literal(part.title()));
        out.push_str("    />\n");
        out.push_str("  )\n");
        out.push_str("}\n");

        Ok(out)
    }
}
