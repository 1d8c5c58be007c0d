//! Entity field declarations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::FieldKind;

/// Extra string-format validation a field may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    Email,
    Url,
}

/// One field of an entity.
///
/// The wire format is camelCase to match manifest documents
/// (`maxLength`, `references`, ...). Constraint fields that do not
/// apply to the declared kind are ignored by the generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityField {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: FieldKind,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,

    /// Value is produced by the platform (ids, timestamps), never
    /// accepted from input.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generated: bool,

    /// Refreshed on every update (`updatedAt`).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub updated: bool,

    /// Excluded from every validation schema and from API output.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Enum membership. An enum field with an empty list degrades to
    /// unconstrained string acceptance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldFormat>,

    /// Foreign relation, spelled `Entity.field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntityField {
    /// Minimal field with just a name and a kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            unique: false,
            primary: false,
            generated: false,
            updated: false,
            sensitive: false,
            max_length: None,
            min_length: None,
            min: None,
            max: None,
            pattern: None,
            values: Vec::new(),
            default: None,
            validation: None,
            references: None,
            description: None,
        }
    }

    /// Split a `references` declaration into `(entity, field)`.
    ///
    /// Returns `None` when the field carries no relation or the
    /// declaration is missing the `.` separator.
    pub fn reference_target(&self) -> Option<(&str, &str)> {
        let spec = self.references.as_deref()?;
        let (entity, field) = spec.split_once('.')?;
        if entity.is_empty() || field.is_empty() {
            return None;
        }
        Some((entity, field))
    }
}
