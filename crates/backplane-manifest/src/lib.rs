//! Manifest vocabulary for Backplane.
//!
//! A manifest is the single declarative input to the platform: entity
//! definitions (fields, constraints, per-action policy strings), app
//! metadata, and feature flags. Everything downstream — validation
//! schemas, SQL DDL, OpenAPI documents, the generated REST surface —
//! is compiled from the types in this crate.
//!
//! A manifest is loaded once and is immutable afterwards; re-loading
//! fully replaces prior definitions. Structural problems are reported
//! by [`Manifest::check`] as a list of issues, never as a failure to
//! construct: a malformed manifest still produces a `Manifest`, and the
//! consequences surface only when the affected entity is used.

mod entity;
mod features;
mod field;
mod kind;
mod load;

pub use entity::{EntityDefinition, EntityPolicies, Manifest, ManifestIssue, ManifestMetadata};
pub use features::{AuthFeature, FeatureFlags, FeatureToggle};
pub use field::{EntityField, FieldFormat};
pub use kind::FieldKind;
pub use load::ManifestError;
