//! REST surface over an [`Engine`].
//!
//! One router serves health and metadata, a dynamic `/api/{entity}`
//! CRUD dispatcher driven entirely by the manifest, the `/auth/*`
//! routes, and the generated OpenAPI document. Handlers never see
//! entity-specific code: entity resolution, policy checks, and
//! validation all come from the engine's precompiled runtimes.

mod auth_routes;
mod dispatch;
mod docs;
mod error;

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use backplane_auth::{bearer_token, cookie_token};
use backplane_engine::{Engine, Identity};
use serde_json::{Value, json};

pub use error::ApiError;

/// Build the full application router.
pub fn build_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(root))
        .route(
            "/api/{entity}",
            get(dispatch::list_records).post(dispatch::create_record),
        )
        .route(
            "/api/{entity}/{id}",
            get(dispatch::get_record)
                .patch(dispatch::update_record)
                .delete(dispatch::delete_record),
        )
        .route("/auth/login", post(auth_routes::login))
        .route("/auth/refresh", post(auth_routes::refresh))
        .route("/auth/current-user", get(auth_routes::current_user))
        .route("/openapi.json", get(docs::openapi))
        .route("/docs", get(docs::docs))
        .with_state(engine)
}

/// Caller identity from `Authorization: Bearer` with a cookie
/// fallback. Absent or invalid credentials read as anonymous.
pub(crate) fn identity(engine: &Engine, headers: &HeaderMap) -> Option<Identity> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);
    let token = bearer.or_else(|| {
        headers
            .get("cookie")
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| cookie_token(cookies, "access_token"))
    })?;
    engine.authenticate(token)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn root(State(engine): State<Arc<Engine>>) -> Json<Value> {
    let entities: Vec<Value> = engine
        .entities()
        .map(|runtime| {
            json!({
                "name": runtime.definition.name,
                "path": format!("/api/{}", runtime.definition.table()),
            })
        })
        .collect();
    Json(json!({
        "name": engine.manifest().app_name(),
        "version": engine.manifest().app_version(),
        "entities": entities,
    }))
}
