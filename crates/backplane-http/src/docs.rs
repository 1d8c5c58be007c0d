//! OpenAPI document and documentation page.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::Html;
use backplane_codegen::generate_openapi;
use backplane_engine::Engine;
use serde_json::Value;

use crate::error::ApiError;

pub(crate) async fn openapi(
    State(engine): State<Arc<Engine>>,
) -> Result<Json<Value>, ApiError> {
    let document = generate_openapi(engine.manifest());
    serde_json::to_value(&document)
        .map(Json)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub(crate) async fn docs(State(engine): State<Arc<Engine>>) -> Html<String> {
    let title = engine.manifest().app_name().to_string();
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{title} API</title>
  <meta charset="utf-8"/>
  <meta name="viewport" content="width=device-width, initial-scale=1"/>
</head>
<body>
  <redoc spec-url="/openapi.json"></redoc>
  <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
</body>
</html>"#
    ))
}
