//! End-to-end validation over a manifest loaded from JSON.

use backplane_manifest::Manifest;
use backplane_validate::{EntityValidator, IssueCode, Validated};
use serde_json::json;

const MANIFEST: &str = r#"{
  "metadata": { "name": "Shop", "version": "1.0.0" },
  "entities": [
    {
      "name": "Product",
      "fields": [
        { "name": "id", "type": "uuid", "generated": true, "primary": true },
        { "name": "name", "type": "string", "required": true, "minLength": 1, "maxLength": 120 },
        { "name": "price", "type": "decimal", "required": true, "min": 0 },
        { "name": "status", "type": "enum", "values": ["draft", "listed"], "default": "draft" },
        { "name": "createdAt", "type": "timestamp", "generated": true }
      ]
    }
  ]
}"#;

fn validator() -> EntityValidator {
    let manifest = Manifest::from_json(MANIFEST).unwrap();
    EntityValidator::new(manifest.entity("Product").unwrap())
}

#[test]
fn invalid_create_reports_every_issue() {
    let result = validator().validate_create(&json!({"name": "", "price": -1}));
    match result {
        Validated::Invalid(issues) => {
            assert_eq!(issues.len(), 2);
            assert_eq!(issues[0].field, "name");
            assert_eq!(issues[0].code, IssueCode::TooShort);
            assert_eq!(issues[1].field, "price");
            assert_eq!(issues[1].code, IssueCode::TooSmall);
        }
        Validated::Valid(value) => panic!("expected issues, got {value}"),
    }
}

#[test]
fn valid_create_gets_the_declared_default() {
    let result = validator().validate_create(&json!({"name": "Pen", "price": 1.5}));
    assert_eq!(
        result.into_value().unwrap(),
        json!({"name": "Pen", "price": 1.5, "status": "draft"})
    );
}

#[test]
fn generated_fields_never_come_from_input() {
    let result = validator().validate_create(&json!({
        "name": "Pen",
        "price": 1.5,
        "id": "11111111-1111-4111-8111-111111111111",
        "createdAt": "2020-01-01T00:00:00Z"
    }));
    let value = result.into_value().unwrap();
    assert!(value.get("id").is_none());
    assert!(value.get("createdAt").is_none());
}
