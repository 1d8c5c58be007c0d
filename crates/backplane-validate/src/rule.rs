//! Per-field validation rules and schema application.

use std::sync::LazyLock;

use backplane_manifest::{EntityField, FieldFormat, FieldKind};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::issue::{IssueCode, ValidationIssue};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static pattern"));

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").expect("static pattern"));

/// Whether a field must be present, may be absent, or is filled from
/// a declared default when absent.
#[derive(Debug, Clone)]
pub enum Requirement {
    Required,
    Optional,
    Defaulted(Value),
}

#[derive(Debug, Clone)]
enum Pattern {
    Compiled(Regex),
    /// The declared pattern did not compile; the rule fails closed and
    /// rejects every value until the manifest is fixed.
    Invalid,
}

/// One precompiled per-field rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    pub requirement: Requirement,
    max_length: Option<u64>,
    min_length: Option<u64>,
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<Pattern>,
    values: Vec<String>,
    format: Option<FieldFormat>,
}

impl FieldRule {
    /// Compile a rule from a manifest field.
    pub fn from_field(field: &EntityField, requirement: Requirement) -> Self {
        let pattern = field.pattern.as_deref().map(|raw| match Regex::new(raw) {
            Ok(regex) => Pattern::Compiled(regex),
            Err(_) => Pattern::Invalid,
        });
        Self {
            name: field.name.clone(),
            kind: field.kind,
            requirement,
            max_length: field.max_length,
            min_length: field.min_length,
            min: field.min,
            max: field.max,
            pattern,
            values: field.values.clone(),
            format: field.validation,
        }
    }

    /// Hand-built rule for pagination controls.
    pub fn synthetic(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            requirement: Requirement::Optional,
            max_length: None,
            min_length: None,
            min: None,
            max: None,
            pattern: None,
            values: Vec::new(),
            format: None,
        }
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_values(mut self, values: &[&str]) -> Self {
        self.values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Check one present value; `Ok` carries the (possibly
    /// canonicalized) value to place into the output.
    pub fn check(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>> {
        match self.kind {
            FieldKind::String | FieldKind::Text | FieldKind::RichText | FieldKind::File => {
                self.check_string(value)
            }
            FieldKind::Integer => self.check_number(value, true),
            FieldKind::Decimal => self.check_number(value, false),
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(vec![self.issue(
                    IssueCode::InvalidType,
                    format!("{} must be a boolean", self.name),
                )]),
            },
            FieldKind::Enum => self.check_enum(value),
            FieldKind::Uuid => self.check_uuid(value),
            FieldKind::Timestamp => self.check_timestamp(value),
            FieldKind::Json => match value {
                Value::Object(_) | Value::Array(_) => Ok(value.clone()),
                _ => Err(vec![self.issue(
                    IssueCode::InvalidJson,
                    format!("{} must be an object or array", self.name),
                )]),
            },
        }
    }

    fn check_string(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>> {
        let Value::String(text) = value else {
            return Err(vec![self.issue(
                IssueCode::InvalidType,
                format!("{} must be a string", self.name),
            )]);
        };

        let mut issues = Vec::new();
        let length = text.chars().count() as u64;

        if let Some(max) = self.max_length
            && length > max
        {
            issues.push(self.issue(
                IssueCode::TooLong,
                format!("{} must be at most {max} characters", self.name),
            ));
        }
        if let Some(min) = self.min_length
            && length < min
        {
            issues.push(self.issue(
                IssueCode::TooShort,
                format!("{} must be at least {min} characters", self.name),
            ));
        }
        match &self.pattern {
            Some(Pattern::Compiled(regex)) if !regex.is_match(text) => {
                issues.push(self.issue(
                    IssueCode::PatternMismatch,
                    format!("{} format is invalid", self.name),
                ));
            }
            Some(Pattern::Invalid) => {
                issues.push(self.issue(
                    IssueCode::PatternMismatch,
                    format!("{} pattern is not a valid expression", self.name),
                ));
            }
            _ => {}
        }
        match self.format {
            Some(FieldFormat::Email) if !EMAIL.is_match(text) => {
                issues.push(self.issue(
                    IssueCode::InvalidEmail,
                    format!("{} must be a valid email", self.name),
                ));
            }
            Some(FieldFormat::Url) if !URL.is_match(text) => {
                issues.push(self.issue(
                    IssueCode::InvalidUrl,
                    format!("{} must be a valid URL", self.name),
                ));
            }
            _ => {}
        }

        if issues.is_empty() {
            Ok(value.clone())
        } else {
            Err(issues)
        }
    }

    fn check_number(&self, value: &Value, integral: bool) -> Result<Value, Vec<ValidationIssue>> {
        let Value::Number(number) = value else {
            return Err(vec![self.issue(
                IssueCode::InvalidType,
                format!("{} must be a number", self.name),
            )]);
        };
        let Some(n) = number.as_f64() else {
            return Err(vec![self.issue(
                IssueCode::InvalidType,
                format!("{} must be a number", self.name),
            )]);
        };

        let mut issues = Vec::new();
        if integral && !(number.is_i64() || number.is_u64() || n.fract() == 0.0) {
            issues.push(self.issue(
                IssueCode::InvalidType,
                format!("{} must be an integer", self.name),
            ));
        }
        if let Some(min) = self.min
            && n < min
        {
            issues.push(self.issue(
                IssueCode::TooSmall,
                format!("{} must be at least {min}", self.name),
            ));
        }
        if let Some(max) = self.max
            && n > max
        {
            issues.push(self.issue(
                IssueCode::TooBig,
                format!("{} must be at most {max}", self.name),
            ));
        }

        if issues.is_empty() {
            Ok(value.clone())
        } else {
            Err(issues)
        }
    }

    fn check_enum(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>> {
        let Value::String(text) = value else {
            return Err(vec![self.issue(
                IssueCode::InvalidType,
                format!("{} must be a string", self.name),
            )]);
        };
        // An enum with no declared values degrades to plain string.
        if !self.values.is_empty() && !self.values.iter().any(|v| v == text) {
            return Err(vec![self.issue(
                IssueCode::InvalidEnumValue,
                format!("{} must be one of: {}", self.name, self.values.join(", ")),
            )]);
        }
        Ok(value.clone())
    }

    fn check_uuid(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>> {
        let Value::String(text) = value else {
            return Err(vec![self.issue(
                IssueCode::InvalidType,
                format!("{} must be a string", self.name),
            )]);
        };
        if Uuid::parse_str(text).is_err() {
            return Err(vec![self.issue(
                IssueCode::InvalidUuid,
                format!("{} must be a valid UUID", self.name),
            )]);
        }
        Ok(value.clone())
    }

    /// The single coercion point: RFC 3339 input is re-emitted in
    /// canonical UTC millisecond form.
    fn check_timestamp(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>> {
        let Value::String(text) = value else {
            return Err(vec![self.issue(
                IssueCode::InvalidTimestamp,
                format!("{} must be an RFC 3339 timestamp", self.name),
            )]);
        };
        match DateTime::parse_from_rfc3339(text) {
            Ok(parsed) => Ok(Value::String(
                parsed
                    .with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            )),
            Err(_) => Err(vec![self.issue(
                IssueCode::InvalidTimestamp,
                format!("{} must be an RFC 3339 timestamp", self.name),
            )]),
        }
    }

    fn issue(&self, code: IssueCode, message: String) -> ValidationIssue {
        ValidationIssue::new(&self.name, code, message)
    }
}

/// A compiled schema: ordered field rules applied to a JSON object.
///
/// Unknown keys are dropped from the output, absent optional fields
/// stay absent, and declared defaults are injected.
#[derive(Debug, Clone)]
pub struct Schema {
    rules: Vec<FieldRule>,
}

impl Schema {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Apply the schema, producing typed output or issue list.
    pub fn apply(&self, data: &Value) -> Result<Value, Vec<ValidationIssue>> {
        let Value::Object(input) = data else {
            return Err(vec![ValidationIssue::new(
                "root",
                IssueCode::InvalidType,
                "payload must be an object",
            )]);
        };

        let mut output = Map::new();
        let mut issues = Vec::new();

        for rule in &self.rules {
            match input.get(&rule.name) {
                Some(Value::Null) | None => match &rule.requirement {
                    Requirement::Required => issues.push(ValidationIssue::new(
                        &rule.name,
                        IssueCode::Required,
                        format!("{} is required", rule.name),
                    )),
                    Requirement::Defaulted(default) => {
                        output.insert(rule.name.clone(), default.clone());
                    }
                    Requirement::Optional => {}
                },
                Some(value) => match rule.check(value) {
                    Ok(checked) => {
                        output.insert(rule.name.clone(), checked);
                    }
                    Err(mut field_issues) => issues.append(&mut field_issues),
                },
            }
        }

        if issues.is_empty() {
            Ok(Value::Object(output))
        } else {
            Err(issues)
        }
    }
}
