//! Rust type listing generation.

use std::fmt::Write;

use backplane_manifest::{FieldKind, Manifest};

fn rust_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Uuid => "Uuid",
        FieldKind::Integer => "i64",
        FieldKind::Decimal => "f64",
        FieldKind::Boolean => "bool",
        FieldKind::Timestamp => "DateTime<Utc>",
        FieldKind::Json => "Value",
        FieldKind::String
        | FieldKind::Text
        | FieldKind::RichText
        | FieldKind::Enum
        | FieldKind::File => "String",
    }
}

/// Render serde-ready struct declarations for every entity.
///
/// Sensitive fields are omitted; fields that are neither required nor
/// primary become `Option<_>`.
pub fn generate_rust_types(manifest: &Manifest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// Generated types for {}", manifest.app_name());
    let _ = writeln!(out);
    let _ = writeln!(out, "use chrono::{{DateTime, Utc}};");
    let _ = writeln!(out, "use serde::{{Deserialize, Serialize}};");
    let _ = writeln!(out, "use serde_json::Value;");
    let _ = writeln!(out, "use uuid::Uuid;");

    for entity in &manifest.entities {
        let _ = writeln!(out);
        let _ = writeln!(out, "#[derive(Debug, Clone, Serialize, Deserialize)]");
        let _ = writeln!(out, "#[serde(rename_all = \"camelCase\")]");
        let _ = writeln!(out, "pub struct {} {{", entity.name);
        for field in entity.fields.iter().filter(|f| !f.sensitive) {
            let base = rust_type(field.kind);
            let ty = if field.required || field.primary {
                base.to_string()
            } else {
                format!("Option<{base}>")
            };
            let _ = writeln!(out, "    pub {}: {ty},", snake_case(&field.name));
        }
        let _ = writeln!(out, "}}");
    }

    out
}

/// camelCase manifest names become snake_case struct members; serde's
/// `rename_all` maps them back on the wire.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
