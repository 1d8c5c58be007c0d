//! SQLite DDL generation.

use std::fmt::Write;

use backplane_manifest::{EntityField, Manifest};
use serde_json::Value;

/// Render the full migration script for a manifest.
///
/// Output is deterministic: entities and fields appear in declaration
/// order and the header carries no timestamp, so regenerating from the
/// same manifest produces the same bytes.
pub fn generate_migrations(manifest: &Manifest) -> String {
    let mut sql = String::new();
    let _ = writeln!(sql, "-- Auto-generated migration");
    let _ = writeln!(sql, "-- App: {}", manifest.app_name());

    for entity in &manifest.entities {
        let table = entity.table();
        let _ = writeln!(sql);
        let _ = writeln!(sql, "CREATE TABLE IF NOT EXISTS {table} (");

        let columns: Vec<String> = entity.fields.iter().map(column_definition).collect();
        let _ = writeln!(sql, "{}", columns.join(",\n"));
        let _ = writeln!(sql, ");");

        for field in &entity.fields {
            if field.unique && !field.primary {
                let _ = writeln!(
                    sql,
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_{name} ON {table}({name});",
                    name = field.name
                );
            }
            if field.reference_target().is_some() {
                let _ = writeln!(
                    sql,
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{name} ON {table}({name});",
                    name = field.name
                );
            }
        }
    }

    sql
}

fn column_definition(field: &EntityField) -> String {
    let mut column = format!("  {} {}", field.name, field.kind.sql_type());

    if field.primary {
        column.push_str(" PRIMARY KEY");
    } else if field.required {
        column.push_str(" NOT NULL");
    }

    if field.generated && field.name == "createdAt" {
        column.push_str(" DEFAULT CURRENT_TIMESTAMP");
    } else if !field.generated
        && let Some(default) = &field.default
    {
        column.push_str(" DEFAULT ");
        column.push_str(&sql_literal(default));
    }

    column
}

/// Render a JSON default as a SQLite literal. Booleans become 0/1,
/// strings are single-quoted with embedded quotes doubled.
fn sql_literal(value: &Value) -> String {
    match value {
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backplane_manifest::{EntityDefinition, EntityField, FieldKind, ManifestMetadata};
    use serde_json::json;

    fn manifest() -> Manifest {
        let mut id = EntityField::new("id", FieldKind::Uuid);
        id.primary = true;
        id.generated = true;
        let mut name = EntityField::new("name", FieldKind::String);
        name.required = true;
        let mut sku = EntityField::new("sku", FieldKind::String);
        sku.unique = true;
        let mut status = EntityField::new("status", FieldKind::Enum);
        status.values = vec!["draft".to_string()];
        status.default = Some(json!("draft"));
        let mut owner = EntityField::new("ownerId", FieldKind::Uuid);
        owner.references = Some("User.id".to_string());
        let mut created = EntityField::new("createdAt", FieldKind::Timestamp);
        created.generated = true;

        Manifest {
            metadata: Some(ManifestMetadata {
                name: "Shop".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            }),
            features: Default::default(),
            entities: vec![
                EntityDefinition::new("Product", vec![id, name, sku, status, owner, created]),
                EntityDefinition::new("User", vec![EntityField::new("id", FieldKind::Uuid)]),
            ],
        }
    }

    #[test]
    fn renders_expected_ddl() {
        let sql = generate_migrations(&manifest());
        assert!(sql.starts_with("-- Auto-generated migration\n-- App: Shop\n"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS product (\n"));
        assert!(sql.contains("  id TEXT PRIMARY KEY,\n"));
        assert!(sql.contains("  name TEXT NOT NULL,\n"));
        assert!(sql.contains("  status TEXT DEFAULT 'draft',\n"));
        assert!(sql.contains("  createdAt TEXT DEFAULT CURRENT_TIMESTAMP\n"));
        assert!(sql.contains(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_product_sku ON product(sku);"
        ));
        assert!(sql.contains(
            "CREATE INDEX IF NOT EXISTS idx_product_ownerId ON product(ownerId);"
        ));
    }

    #[test]
    fn output_is_deterministic() {
        let m = manifest();
        assert_eq!(generate_migrations(&m), generate_migrations(&m));
    }

    #[test]
    fn string_defaults_escape_quotes() {
        assert_eq!(sql_literal(&json!("o'clock")), "'o''clock'");
        assert_eq!(sql_literal(&json!(true)), "1");
        assert_eq!(sql_literal(&json!(3.5)), "3.5");
    }
}
