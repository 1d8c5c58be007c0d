//! Canonical field kinds and their one table-driven mapping.
//!
//! Every generator in the platform (validator, migrations, OpenAPI)
//! branches on the same closed [`FieldKind`] sum type and reads the
//! same mapping tables below. There is deliberately no second place
//! where a field type string is interpreted.

use serde::{Deserialize, Serialize};

/// The closed set of field types a manifest may declare.
///
/// Wire spellings follow the manifest format: `decimal` and `float`
/// are the same kind, as are `timestamp`, `date`, and `datetime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Uuid,
    String,
    Text,
    #[serde(rename = "richtext")]
    RichText,
    Integer,
    #[serde(alias = "float")]
    Decimal,
    Boolean,
    Enum,
    #[serde(alias = "date", alias = "datetime")]
    Timestamp,
    Json,
    File,
}

impl FieldKind {
    /// SQLite column type for this kind.
    ///
    /// Booleans are stored as INTEGER 0/1; dates, JSON, and file
    /// paths as TEXT.
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Integer | FieldKind::Boolean => "INTEGER",
            FieldKind::Decimal => "REAL",
            FieldKind::Uuid
            | FieldKind::String
            | FieldKind::Text
            | FieldKind::RichText
            | FieldKind::Enum
            | FieldKind::Timestamp
            | FieldKind::Json
            | FieldKind::File => "TEXT",
        }
    }

    /// JSON Schema `type` for this kind.
    pub fn json_type(self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Json => "object",
            _ => "string",
        }
    }

    /// JSON Schema `format`, where one applies to the kind itself.
    pub fn json_format(self) -> Option<&'static str> {
        match self {
            FieldKind::Uuid => Some("uuid"),
            FieldKind::Timestamp => Some("date-time"),
            _ => None,
        }
    }

    /// Canonical wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Uuid => "uuid",
            FieldKind::String => "string",
            FieldKind::Text => "text",
            FieldKind::RichText => "richtext",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Enum => "enum",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Json => "json",
            FieldKind::File => "file",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
