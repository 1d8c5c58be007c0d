//! Per-entity validators with precompiled schemas.

use backplane_manifest::{EntityDefinition, EntityField, FieldKind};
use serde_json::Value;

use crate::issue::ValidationIssue;
use crate::rule::{FieldRule, Requirement, Schema};

/// Outcome of applying a schema. Invalid input is data, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    Valid(Value),
    Invalid(Vec<ValidationIssue>),
}

impl Validated {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validated::Valid(_))
    }

    /// The typed payload, when validation passed.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Validated::Valid(value) => Some(value),
            Validated::Invalid(_) => None,
        }
    }

    /// The issue list; empty when validation passed.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Validated::Valid(_) => &[],
            Validated::Invalid(issues) => issues,
        }
    }
}

/// Field names the platform fills in itself on create.
const PLATFORM_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

fn platform_managed(field: &EntityField) -> bool {
    field.generated || PLATFORM_FIELDS.contains(&field.name.as_str())
}

/// Three precompiled schemas for one entity.
///
/// Construction walks the field list once; applying a schema does no
/// further manifest lookups or regex compilation.
#[derive(Debug, Clone)]
pub struct EntityValidator {
    entity: String,
    create: Schema,
    update: Schema,
    filter: Schema,
}

impl EntityValidator {
    pub fn new(entity: &EntityDefinition) -> Self {
        let mut create_rules = Vec::new();
        let mut update_rules = Vec::new();
        let mut filter_rules = Vec::new();

        for field in &entity.fields {
            if field.sensitive || platform_managed(field) {
                continue;
            }
            let requirement = match (&field.default, field.required) {
                (Some(default), _) => Requirement::Defaulted(default.clone()),
                (None, true) => Requirement::Required,
                (None, false) => Requirement::Optional,
            };
            create_rules.push(FieldRule::from_field(field, requirement));
            update_rules.push(FieldRule::from_field(field, Requirement::Optional));
            filter_rules.push(FieldRule::from_field(field, Requirement::Optional));
        }

        filter_rules.push(
            FieldRule::synthetic("limit", FieldKind::Integer).with_range(Some(1.0), Some(100.0)),
        );
        filter_rules
            .push(FieldRule::synthetic("offset", FieldKind::Integer).with_range(Some(0.0), None));
        filter_rules.push(FieldRule::synthetic("orderBy", FieldKind::String));
        filter_rules
            .push(FieldRule::synthetic("orderDirection", FieldKind::Enum).with_values(&["asc", "desc"]));

        Self {
            entity: entity.name.clone(),
            create: Schema::new(create_rules),
            update: Schema::new(update_rules),
            filter: Schema::new(filter_rules),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Validate a create payload: required fields enforced, declared
    /// defaults injected, platform-managed and sensitive fields never
    /// accepted from input.
    pub fn validate_create(&self, data: &Value) -> Validated {
        apply(&self.create, data)
    }

    /// Validate an update payload: every field optional, `{}` is valid.
    pub fn validate_update(&self, data: &Value) -> Validated {
        apply(&self.update, data)
    }

    /// Validate list/filter parameters, including pagination controls.
    pub fn validate_filter(&self, data: &Value) -> Validated {
        apply(&self.filter, data)
    }

    pub fn create_schema(&self) -> &Schema {
        &self.create
    }

    pub fn update_schema(&self) -> &Schema {
        &self.update
    }

    pub fn filter_schema(&self) -> &Schema {
        &self.filter
    }
}

fn apply(schema: &Schema, data: &Value) -> Validated {
    match schema.apply(data) {
        Ok(value) => Validated::Valid(value),
        Err(issues) => Validated::Invalid(issues),
    }
}
