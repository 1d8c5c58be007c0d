//! Dynamic entity CRUD dispatcher.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, response::IntoResponse};
use backplane_engine::{Engine, EntityRuntime, Identity};
use backplane_manifest::EntityDefinition;
use backplane_policy::{AccessContext, EntityAction};
use backplane_store::{ListQuery, RecordStore};
use backplane_validate::Validated;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity;

fn resolve<'a>(engine: &'a Engine, table: &str) -> Result<&'a EntityRuntime, ApiError> {
    engine.entity_by_table(table).ok_or(ApiError::NotFound)
}

fn records(engine: &Engine) -> Result<&Arc<dyn RecordStore>, ApiError> {
    engine
        .records()
        .ok_or_else(|| ApiError::Internal("no record store configured".to_string()))
}

fn context(identity: Option<&Identity>, is_owner: bool) -> AccessContext {
    match identity {
        Some(identity) => identity.access_context(is_owner),
        None => AccessContext::anonymous(),
    }
}

fn record_owned_by(record: &Value, identity: Option<&Identity>) -> bool {
    match identity {
        Some(identity) => {
            record.get("ownerId").and_then(Value::as_str) == Some(identity.user_id.as_str())
        }
        None => false,
    }
}

/// Drop sensitive fields from an outgoing record.
fn strip_sensitive(definition: &EntityDefinition, record: Value) -> Value {
    let Value::Object(mut fields) = record else {
        return record;
    };
    for field in definition.fields.iter().filter(|f| f.sensitive) {
        fields.remove(&field.name);
    }
    Value::Object(fields)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stamp every `updated`-flagged field with the current time.
fn stamp_updated(definition: &EntityDefinition, record: &mut Map<String, Value>) {
    for field in definition.fields.iter().filter(|f| f.updated) {
        record.insert(field.name.clone(), json!(now()));
    }
}

/// Refuse before the record lookup when the policy denies the caller
/// even as owner, so a 403 carries no hint of whether the id exists.
fn deny_before_lookup(
    runtime: &EntityRuntime,
    action: EntityAction,
    identity: Option<&Identity>,
) -> Result<(), ApiError> {
    if !runtime.policies.allows(action, &context(identity, true)) {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// Query strings arrive as text; numbers and booleans are coerced so
/// the filter schema can check them.
fn coerce_query(params: BTreeMap<String, String>) -> Value {
    let mut object = Map::new();
    for (key, value) in params {
        let coerced = if let Ok(n) = value.parse::<i64>() {
            json!(n)
        } else {
            match value.as_str() {
                "true" => json!(true),
                "false" => json!(false),
                _ => json!(value),
            }
        };
        object.insert(key, coerced);
    }
    Value::Object(object)
}

fn validated_or_422(validated: Validated) -> Result<Value, ApiError> {
    match validated {
        Validated::Valid(value) => Ok(value),
        Validated::Invalid(issues) => Err(ApiError::Validation(issues)),
    }
}

pub(crate) async fn list_records(
    State(engine): State<Arc<Engine>>,
    Path(entity): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let runtime = resolve(&engine, &entity)?;
    let identity = identity(&engine, &headers);
    if !runtime
        .policies
        .allows(EntityAction::List, &context(identity.as_ref(), false))
    {
        return Err(ApiError::Forbidden);
    }

    let filter = validated_or_422(runtime.validator.validate_filter(&coerce_query(params)))?;
    let filter = filter.as_object().cloned().unwrap_or_default();

    let mut query = ListQuery::default();
    if let Some(limit) = filter.get("limit").and_then(Value::as_u64) {
        query.limit = limit;
    }
    if let Some(offset) = filter.get("offset").and_then(Value::as_u64) {
        query.offset = offset;
    }
    query.order_by = filter
        .get("orderBy")
        .and_then(Value::as_str)
        .map(str::to_string);
    query.descending = filter.get("orderDirection").and_then(Value::as_str) == Some("desc");
    for (key, value) in &filter {
        if !matches!(key.as_str(), "limit" | "offset" | "orderBy" | "orderDirection") {
            query.filters.insert(key.clone(), value.clone());
        }
    }

    let rows = records(&engine)?.list(&runtime.definition.table(), &query)?;
    let rows: Vec<Value> = rows
        .into_iter()
        .map(|row| strip_sensitive(&runtime.definition, row))
        .collect();

    Ok(Json(json!({
        "records": rows,
        "limit": query.limit,
        "offset": query.offset,
    })))
}

pub(crate) async fn create_record(
    State(engine): State<Arc<Engine>>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let runtime = resolve(&engine, &entity)?;
    let identity = identity(&engine, &headers);
    if !runtime
        .policies
        .allows(EntityAction::Create, &context(identity.as_ref(), false))
    {
        return Err(ApiError::Forbidden);
    }
    if body.get("id").is_some() {
        return Err(ApiError::BadRequest("id is generated by the server".to_string()));
    }

    let validated = validated_or_422(runtime.validator.validate_create(&body))?;
    let Value::Object(mut record) = validated else {
        return Err(ApiError::Internal("validator produced a non-object".to_string()));
    };

    record.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
    let definition = &runtime.definition;
    if definition.field("createdAt").is_some() {
        record.insert("createdAt".to_string(), json!(now()));
    }
    stamp_updated(definition, &mut record);
    if let Some(identity) = &identity
        && definition.field("ownerId").is_some()
        && !record.contains_key("ownerId")
    {
        record.insert("ownerId".to_string(), json!(identity.user_id));
    }

    let stored = records(&engine)?.insert(&definition.table(), Value::Object(record))?;
    Ok((
        StatusCode::CREATED,
        Json(strip_sensitive(definition, stored)),
    ))
}

pub(crate) async fn get_record(
    State(engine): State<Arc<Engine>>,
    Path((entity, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let runtime = resolve(&engine, &entity)?;
    let identity = identity(&engine, &headers);
    deny_before_lookup(runtime, EntityAction::Get, identity.as_ref())?;
    let record = records(&engine)?
        .get(&runtime.definition.table(), &id)?
        .ok_or(ApiError::NotFound)?;

    let is_owner = record_owned_by(&record, identity.as_ref());
    if !runtime
        .policies
        .allows(EntityAction::Get, &context(identity.as_ref(), is_owner))
    {
        return Err(ApiError::Forbidden);
    }

    Ok(Json(strip_sensitive(&runtime.definition, record)))
}

pub(crate) async fn update_record(
    State(engine): State<Arc<Engine>>,
    Path((entity, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let runtime = resolve(&engine, &entity)?;
    let identity = identity(&engine, &headers);
    deny_before_lookup(runtime, EntityAction::Update, identity.as_ref())?;
    let store = records(&engine)?;
    let existing = store
        .get(&runtime.definition.table(), &id)?
        .ok_or(ApiError::NotFound)?;

    let is_owner = record_owned_by(&existing, identity.as_ref());
    if !runtime
        .policies
        .allows(EntityAction::Update, &context(identity.as_ref(), is_owner))
    {
        return Err(ApiError::Forbidden);
    }

    let validated = validated_or_422(runtime.validator.validate_update(&body))?;
    let Value::Object(mut changes) = validated else {
        return Err(ApiError::Internal("validator produced a non-object".to_string()));
    };
    stamp_updated(&runtime.definition, &mut changes);

    let updated = store
        .update(&runtime.definition.table(), &id, &Value::Object(changes))?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(strip_sensitive(&runtime.definition, updated)))
}

pub(crate) async fn delete_record(
    State(engine): State<Arc<Engine>>,
    Path((entity, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let runtime = resolve(&engine, &entity)?;
    let identity = identity(&engine, &headers);
    deny_before_lookup(runtime, EntityAction::Delete, identity.as_ref())?;
    let store = records(&engine)?;
    let existing = store
        .get(&runtime.definition.table(), &id)?
        .ok_or(ApiError::NotFound)?;

    let is_owner = record_owned_by(&existing, identity.as_ref());
    if !runtime
        .policies
        .allows(EntityAction::Delete, &context(identity.as_ref(), is_owner))
    {
        return Err(ApiError::Forbidden);
    }

    if !store.delete(&runtime.definition.table(), &id)? {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
