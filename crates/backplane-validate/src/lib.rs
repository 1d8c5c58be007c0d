//! Entity validation compiled from manifest definitions.
//!
//! An [`EntityValidator`] turns one `EntityDefinition` into three
//! precompiled schemas — create, update, filter — and applies them to
//! raw JSON input. Invalid input is a normal, reportable outcome
//! ([`Validated::Invalid`] with structured issues), never an error or
//! a panic.
//!
//! The only type coercion in the system happens here and only for
//! timestamps: RFC 3339 strings are parsed and re-emitted in canonical
//! form. Every other type mismatch is rejected as-is.

mod issue;
mod rule;
mod validator;

pub use issue::{IssueCode, ValidationIssue};
pub use rule::{FieldRule, Requirement, Schema};
pub use validator::{EntityValidator, Validated};
