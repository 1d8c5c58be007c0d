//! Login, refresh, and current-user routes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::Json;
use backplane_auth::{PasswordHasher, REFRESH_TTL_SECONDS, cookie_token, session_cookie};
use backplane_engine::Engine;
use backplane_store::ListQuery;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ApiError;
use crate::identity;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Look up the user record matching the login identifier.
fn find_user(engine: &Engine, request: &LoginRequest) -> Result<Option<Value>, ApiError> {
    let Some(runtime) = engine.entity("User") else {
        return Ok(None);
    };
    let store = engine
        .records()
        .ok_or_else(|| ApiError::Internal("no record store configured".to_string()))?;

    let mut filters = BTreeMap::new();
    match (&request.email, &request.phone_number) {
        (Some(email), _) => {
            filters.insert("email".to_string(), json!(email));
        }
        (None, Some(phone)) => {
            filters.insert("phoneNumber".to_string(), json!(phone));
        }
        (None, None) => return Ok(None),
    }

    let query = ListQuery {
        limit: 1,
        filters,
        ..ListQuery::default()
    };
    Ok(store
        .list(&runtime.definition.table(), &query)?
        .into_iter()
        .next())
}

pub(crate) async fn login(
    State(engine): State<Arc<Engine>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !engine.feature_enabled("auth.enabled") {
        return Err(ApiError::NotFound);
    }
    let auth = engine
        .auth()
        .ok_or_else(|| ApiError::Internal("no auth client configured".to_string()))?;

    let user = find_user(&engine, &request)?.ok_or(ApiError::Unauthorized)?;
    let hash = user
        .get("password")
        .and_then(Value::as_str)
        .ok_or(ApiError::Unauthorized)?;
    if !PasswordHasher::new().verify(&request.password, hash) {
        return Err(ApiError::Unauthorized);
    }
    let user_id = user
        .get("id")
        .and_then(Value::as_str)
        .ok_or(ApiError::Unauthorized)?;

    debug!(user = user_id, "login succeeded");
    let pair = auth.token_pair(user_id, Value::Null)?;
    let cookie = session_cookie("refresh_token", &pair.refresh_token, REFRESH_TTL_SECONDS);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::to_value(&pair).map_err(|e| ApiError::Internal(e.to_string()))?),
    ))
}

pub(crate) async fn refresh(
    State(engine): State<Arc<Engine>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<Value>, ApiError> {
    let auth = engine
        .auth()
        .ok_or_else(|| ApiError::Internal("no auth client configured".to_string()))?;

    let from_body = serde_json::from_slice::<RefreshRequest>(&body)
        .ok()
        .and_then(|r| r.refresh_token);
    let token = match from_body {
        Some(token) => token,
        None => headers
            .get("cookie")
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| cookie_token(cookies, "refresh_token"))
            .map(str::to_string)
            .ok_or(ApiError::Unauthorized)?,
    };

    let pair = auth.refresh(&token)?;
    Ok(Json(
        serde_json::to_value(&pair).map_err(|e| ApiError::Internal(e.to_string()))?,
    ))
}

pub(crate) async fn current_user(
    State(engine): State<Arc<Engine>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let identity = identity(&engine, &headers).ok_or(ApiError::Unauthorized)?;

    // Enrich from the User entity when one is stored
    if let (Some(runtime), Some(store)) = (engine.entity("User"), engine.records()) {
        if let Some(record) = store.get(&runtime.definition.table(), &identity.user_id)? {
            let Value::Object(mut fields) = record else {
                return Err(ApiError::Internal("user record is not an object".to_string()));
            };
            for field in runtime.definition.fields.iter().filter(|f| f.sensitive) {
                fields.remove(&field.name);
            }
            fields.remove("password");
            return Ok(Json(Value::Object(fields)));
        }
    }

    Ok(Json(json!({
        "userId": identity.user_id,
        "role": identity.role,
    })))
}
