//! Structured validation issues.

use serde::{Deserialize, Serialize};

/// Stable machine-readable issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    Required,
    InvalidType,
    TooShort,
    TooLong,
    TooSmall,
    TooBig,
    PatternMismatch,
    InvalidEmail,
    InvalidUrl,
    InvalidUuid,
    InvalidEnumValue,
    InvalidTimestamp,
    InvalidJson,
    InvalidValue,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::Required => "required",
            IssueCode::InvalidType => "invalid_type",
            IssueCode::TooShort => "too_short",
            IssueCode::TooLong => "too_long",
            IssueCode::TooSmall => "too_small",
            IssueCode::TooBig => "too_big",
            IssueCode::PatternMismatch => "pattern_mismatch",
            IssueCode::InvalidEmail => "invalid_email",
            IssueCode::InvalidUrl => "invalid_url",
            IssueCode::InvalidUuid => "invalid_uuid",
            IssueCode::InvalidEnumValue => "invalid_enum_value",
            IssueCode::InvalidTimestamp => "invalid_timestamp",
            IssueCode::InvalidJson => "invalid_json",
            IssueCode::InvalidValue => "invalid_value",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub code: IssueCode,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_snake_case() {
        let issue = ValidationIssue::new("price", IssueCode::TooSmall, "price must be at least 0");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["code"], "too_small");
        assert_eq!(json["field"], "price");
    }
}
