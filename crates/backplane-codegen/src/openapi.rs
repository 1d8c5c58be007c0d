//! OpenAPI 3.0 document generation.

use std::collections::BTreeMap;

use backplane_manifest::{EntityDefinition, EntityField, FieldFormat, FieldKind, Manifest};
use serde::Serialize;
use serde_json::Value;

/// A serializable OpenAPI 3.0 document.
///
/// `BTreeMap` keys keep path and schema ordering stable across runs.
#[derive(Debug, Clone, Serialize)]
pub struct OpenApiDocument {
    pub openapi: &'static str,
    pub info: Info,
    pub paths: BTreeMap<String, PathItem>,
    pub components: Components,
}

#[derive(Debug, Clone, Serialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub summary: String,
    pub operation_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, Response>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: &'static str,
    pub required: bool,
    pub schema: SchemaObject,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    pub schema: SchemaObject,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Components {
    pub schemas: BTreeMap<String, SchemaObject>,
}

/// JSON Schema node. One struct covers property schemas, `$ref`
/// nodes, and arrays; unset members are omitted from output.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaObject>>,
}

impl SchemaObject {
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("#/components/schemas/{name}")),
            ..Self::default()
        }
    }

    pub fn typed(schema_type: &'static str) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn array_of(items: SchemaObject) -> Self {
        Self {
            schema_type: Some("array"),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }
}

/// Build the OpenAPI document for a manifest.
pub fn generate_openapi(manifest: &Manifest) -> OpenApiDocument {
    let mut paths = BTreeMap::new();
    let mut schemas = BTreeMap::new();

    schemas.insert("ValidationIssue".to_string(), validation_issue_schema());
    schemas.insert("ValidationError".to_string(), validation_error_schema());

    for entity in &manifest.entities {
        schemas.insert(entity.name.clone(), full_schema(entity));
        schemas.insert(format!("{}Create", entity.name), create_schema(entity));
        schemas.insert(format!("{}Update", entity.name), update_schema(entity));

        let table = entity.table();
        paths.insert(format!("/api/{table}"), collection_path(entity));
        paths.insert(format!("/api/{table}/{{id}}"), item_path(entity));
    }

    OpenApiDocument {
        openapi: "3.0.3",
        info: Info {
            title: manifest.app_name().to_string(),
            version: manifest.app_version().to_string(),
            description: manifest.metadata.as_ref().and_then(|m| m.description.clone()),
        },
        paths,
        components: Components { schemas },
    }
}

fn field_schema(field: &EntityField) -> SchemaObject {
    let format = field.kind.json_format().or(match field.validation {
        Some(FieldFormat::Email) => Some("email"),
        Some(FieldFormat::Url) => Some("uri"),
        None => None,
    });
    SchemaObject {
        schema_type: Some(field.kind.json_type()),
        format,
        enum_values: if field.kind == FieldKind::Enum {
            field.values.clone()
        } else {
            Vec::new()
        },
        min_length: field.min_length,
        max_length: field.max_length,
        minimum: field.min,
        maximum: field.max,
        description: field.description.clone(),
        default: field.default.clone(),
        ..SchemaObject::default()
    }
}

fn full_schema(entity: &EntityDefinition) -> SchemaObject {
    let mut schema = SchemaObject::typed("object");
    for field in entity.fields.iter().filter(|f| !f.sensitive) {
        schema
            .properties
            .insert(field.name.clone(), field_schema(field));
        if field.required || field.primary {
            schema.required.push(field.name.clone());
        }
    }
    schema
}

fn create_schema(entity: &EntityDefinition) -> SchemaObject {
    let mut schema = SchemaObject::typed("object");
    for field in entity.fields.iter().filter(|f| {
        !f.sensitive && !f.generated && f.name != "id"
    }) {
        schema
            .properties
            .insert(field.name.clone(), field_schema(field));
        if field.required && field.default.is_none() {
            schema.required.push(field.name.clone());
        }
    }
    schema
}

fn update_schema(entity: &EntityDefinition) -> SchemaObject {
    let mut schema = SchemaObject::typed("object");
    for field in entity.fields.iter().filter(|f| {
        !f.sensitive && !f.generated && !f.primary && f.name != "id"
    }) {
        schema
            .properties
            .insert(field.name.clone(), field_schema(field));
    }
    schema
}

fn validation_issue_schema() -> SchemaObject {
    let mut schema = SchemaObject::typed("object");
    schema
        .properties
        .insert("field".to_string(), SchemaObject::typed("string"));
    schema
        .properties
        .insert("message".to_string(), SchemaObject::typed("string"));
    schema
        .properties
        .insert("code".to_string(), SchemaObject::typed("string"));
    schema.required = vec!["field".to_string(), "message".to_string(), "code".to_string()];
    schema
}

fn validation_error_schema() -> SchemaObject {
    let mut schema = SchemaObject::typed("object");
    schema.properties.insert(
        "errors".to_string(),
        SchemaObject::array_of(SchemaObject::reference("ValidationIssue")),
    );
    schema.required = vec!["errors".to_string()];
    schema
}

fn json_body(schema: SchemaObject) -> BTreeMap<String, MediaType> {
    BTreeMap::from([("application/json".to_string(), MediaType { schema })])
}

fn response(description: &str, schema: Option<SchemaObject>) -> Response {
    Response {
        description: description.to_string(),
        content: schema.map(json_body),
    }
}

fn collection_path(entity: &EntityDefinition) -> PathItem {
    let name = &entity.name;
    let list = Operation {
        summary: format!("List {name} records"),
        operation_id: format!("list{name}"),
        parameters: vec![
            Parameter {
                name: "limit".to_string(),
                location: "query",
                required: false,
                schema: SchemaObject {
                    schema_type: Some("integer"),
                    minimum: Some(1.0),
                    maximum: Some(100.0),
                    ..SchemaObject::default()
                },
            },
            Parameter {
                name: "offset".to_string(),
                location: "query",
                required: false,
                schema: SchemaObject {
                    schema_type: Some("integer"),
                    minimum: Some(0.0),
                    ..SchemaObject::default()
                },
            },
        ],
        request_body: None,
        responses: BTreeMap::from([
            (
                "200".to_string(),
                response(
                    "Matching records",
                    Some(SchemaObject::array_of(SchemaObject::reference(name))),
                ),
            ),
            ("403".to_string(), response("Access denied", None)),
        ]),
    };

    let create = Operation {
        summary: format!("Create a {name}"),
        operation_id: format!("create{name}"),
        parameters: Vec::new(),
        request_body: Some(RequestBody {
            required: true,
            content: json_body(SchemaObject::reference(&format!("{name}Create"))),
        }),
        responses: BTreeMap::from([
            (
                "201".to_string(),
                response("Created record", Some(SchemaObject::reference(name))),
            ),
            (
                "422".to_string(),
                response(
                    "Validation failed",
                    Some(SchemaObject::reference("ValidationError")),
                ),
            ),
            ("403".to_string(), response("Access denied", None)),
        ]),
    };

    PathItem {
        get: Some(list),
        post: Some(create),
        ..PathItem::default()
    }
}

fn item_path(entity: &EntityDefinition) -> PathItem {
    let name = &entity.name;
    let id_param = Parameter {
        name: "id".to_string(),
        location: "path",
        required: true,
        schema: SchemaObject::typed("string"),
    };

    let get = Operation {
        summary: format!("Fetch a {name} by id"),
        operation_id: format!("get{name}"),
        parameters: vec![id_param.clone()],
        request_body: None,
        responses: BTreeMap::from([
            (
                "200".to_string(),
                response("The record", Some(SchemaObject::reference(name))),
            ),
            ("404".to_string(), response("Not found", None)),
        ]),
    };

    let patch = Operation {
        summary: format!("Update a {name}"),
        operation_id: format!("update{name}"),
        parameters: vec![id_param.clone()],
        request_body: Some(RequestBody {
            required: true,
            content: json_body(SchemaObject::reference(&format!("{name}Update"))),
        }),
        responses: BTreeMap::from([
            (
                "200".to_string(),
                response("Updated record", Some(SchemaObject::reference(name))),
            ),
            ("404".to_string(), response("Not found", None)),
            (
                "422".to_string(),
                response(
                    "Validation failed",
                    Some(SchemaObject::reference("ValidationError")),
                ),
            ),
        ]),
    };

    let delete = Operation {
        summary: format!("Delete a {name}"),
        operation_id: format!("delete{name}"),
        parameters: vec![id_param],
        request_body: None,
        responses: BTreeMap::from([
            ("204".to_string(), response("Deleted", None)),
            ("404".to_string(), response("Not found", None)),
        ]),
    };

    PathItem {
        get: Some(get),
        patch: Some(patch),
        delete: Some(delete),
        ..PathItem::default()
    }
}
