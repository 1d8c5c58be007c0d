//! Entity definitions and the top-level manifest aggregate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::features::FeatureFlags;
use crate::field::EntityField;
use crate::kind::FieldKind;

/// Per-action policy expression strings.
///
/// A missing policy means the action is allowed for everyone; the
/// expressions themselves are compiled by `backplane-policy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityPolicies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

/// One logical resource: a name, a field list, and per-action
/// policies. Defined once at manifest load, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub name: String,

    /// Backing table. Defaults to the lowercased entity name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    pub fields: Vec<EntityField>,

    #[serde(default)]
    pub policies: EntityPolicies,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<EntityField>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            fields,
            policies: EntityPolicies::default(),
        }
    }

    /// Backing table name, defaulting to the lowercased entity name.
    pub fn table(&self) -> String {
        self.table_name
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    pub fn field(&self, name: &str) -> Option<&EntityField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary-key field, when one is declared.
    pub fn primary_field(&self) -> Option<&EntityField> {
        self.fields.iter().find(|f| f.primary)
    }
}

/// App metadata carried through to generated artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A structural problem found by [`Manifest::check`].
///
/// Issues never block manifest construction; they exist so authors can
/// catch mistakes at load time instead of at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIssue {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

impl ManifestIssue {
    fn new(entity: &str, field: Option<&str>, code: &str, message: String) -> Self {
        Self {
            entity: entity.to_string(),
            field: field.map(str::to_string),
            code: code.to_string(),
            message,
        }
    }
}

/// Top-level aggregate: metadata, feature flags, and entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ManifestMetadata>,

    #[serde(default)]
    pub features: FeatureFlags,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityDefinition>,
}

impl Manifest {
    /// App name for generated artifacts, or `"Unknown"`.
    pub fn app_name(&self) -> &str {
        self.metadata.as_ref().map_or("Unknown", |m| m.name.as_str())
    }

    pub fn app_version(&self) -> &str {
        self.metadata
            .as_ref()
            .map_or("1.0.0", |m| m.version.as_str())
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Resolve an entity by its backing table name.
    pub fn entity_by_table(&self, table: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.table() == table)
    }

    /// Report structural issues without failing.
    ///
    /// Checks duplicate entity/field names, enum fields with no
    /// values, and dangling `references` declarations.
    pub fn check(&self) -> Vec<ManifestIssue> {
        let mut issues = Vec::new();
        let mut seen_entities = BTreeSet::new();

        for entity in &self.entities {
            if !seen_entities.insert(entity.name.as_str()) {
                issues.push(ManifestIssue::new(
                    &entity.name,
                    None,
                    "duplicate_entity",
                    format!("entity {} is defined more than once", entity.name),
                ));
            }

            let mut seen_fields = BTreeSet::new();
            for field in &entity.fields {
                if !seen_fields.insert(field.name.as_str()) {
                    issues.push(ManifestIssue::new(
                        &entity.name,
                        Some(&field.name),
                        "duplicate_field",
                        format!("field {} is defined more than once", field.name),
                    ));
                }

                if field.kind == FieldKind::Enum && field.values.is_empty() {
                    issues.push(ManifestIssue::new(
                        &entity.name,
                        Some(&field.name),
                        "enum_without_values",
                        format!(
                            "enum field {} has no values and degrades to plain string",
                            field.name
                        ),
                    ));
                }

                if let Some(spec) = field.references.as_deref() {
                    match field.reference_target() {
                        None => issues.push(ManifestIssue::new(
                            &entity.name,
                            Some(&field.name),
                            "malformed_reference",
                            format!("reference {spec} is not of the form Entity.field"),
                        )),
                        Some((target_entity, target_field)) => {
                            match self.entity(target_entity) {
                                None => issues.push(ManifestIssue::new(
                                    &entity.name,
                                    Some(&field.name),
                                    "unknown_reference_entity",
                                    format!("reference {spec} names an unknown entity"),
                                )),
                                Some(target) if target.field(target_field).is_none() => {
                                    issues.push(ManifestIssue::new(
                                        &entity.name,
                                        Some(&field.name),
                                        "unknown_reference_field",
                                        format!("reference {spec} names an unknown field"),
                                    ));
                                }
                                Some(_) => {}
                            }
                        }
                    }
                }
            }
        }

        issues
    }
}
