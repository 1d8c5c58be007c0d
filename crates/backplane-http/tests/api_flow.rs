//! End-to-end router tests over in-memory backends.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use backplane_auth::{AuthClient, PasswordHasher, TokenSigner};
use backplane_engine::{Engine, EngineConfig};
use backplane_http::build_router;
use backplane_manifest::Manifest;
use backplane_store::{MemoryKv, MemoryRecords, RecordStore, SessionStore};
use serde_json::{Value, json};
use tower::ServiceExt;

const MANIFEST: &str = r#"{
  "metadata": { "name": "Shop", "version": "1.0.0" },
  "features": { "auth": { "enabled": true } },
  "entities": [
    {
      "name": "Product",
      "policies": {
        "create": "authenticated",
        "update": "owner || role:admin",
        "delete": "owner || role:admin"
      },
      "fields": [
        { "name": "id", "type": "uuid", "generated": true, "primary": true },
        { "name": "name", "type": "string", "required": true, "minLength": 1 },
        { "name": "price", "type": "decimal", "required": true, "min": 0 },
        { "name": "status", "type": "enum", "values": ["draft", "listed"], "default": "draft" },
        { "name": "ownerId", "type": "uuid", "references": "User.id" },
        { "name": "costBasis", "type": "decimal", "sensitive": true },
        { "name": "createdAt", "type": "timestamp", "generated": true },
        { "name": "updatedAt", "type": "timestamp", "generated": true, "updated": true },
        { "name": "touchedAt", "type": "timestamp", "updated": true }
      ]
    },
    {
      "name": "Invoice",
      "policies": {
        "update": "role:admin",
        "delete": "role:admin"
      },
      "fields": [
        { "name": "id", "type": "uuid", "generated": true, "primary": true },
        { "name": "amount", "type": "decimal", "required": true }
      ]
    },
    {
      "name": "User",
      "fields": [
        { "name": "id", "type": "uuid", "generated": true, "primary": true },
        { "name": "email", "type": "string", "required": true, "validation": "email" },
        { "name": "password", "type": "string", "sensitive": true }
      ]
    }
  ]
}"#;

const SECRET: &[u8] = b"test-secret";

fn build() -> (Router, Arc<Engine>, Arc<MemoryRecords>) {
    let manifest = Manifest::from_json(MANIFEST).unwrap();
    let records = Arc::new(MemoryRecords::new());
    let kv = Arc::new(MemoryKv::new());
    let auth = AuthClient::new(TokenSigner::new(SECRET.to_vec(), 900))
        .with_sessions(SessionStore::new(kv.clone()));

    let engine = Arc::new(
        EngineConfig::new(manifest)
            .with_records(records.clone())
            .with_kv(kv)
            .with_auth(Arc::new(auth))
            .build(),
    );
    (build_router(engine.clone()), engine, records)
}

fn token(user: &str, role: Option<&str>) -> String {
    let mut extra = serde_json::Map::new();
    if let Some(role) = role {
        extra.insert("role".to_string(), json!(role));
    }
    TokenSigner::new(SECRET.to_vec(), 900)
        .issue(user, None, extra)
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(path: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn with_json(method: &str, path: &str, bearer: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_and_metadata() {
    let (router, _, _) = build();
    let (status, body) = send(&router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&router, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Shop");
    assert!(body["entities"].as_array().unwrap().iter().any(|e| e["path"] == "/api/product"));
}

#[tokio::test]
async fn unknown_entity_is_404() {
    let (router, _, _) = build();
    let (status, _) = send(&router, get("/api/widgets", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_create_is_denied_by_policy() {
    let (router, _, _) = build();
    let (status, _) = send(
        &router,
        with_json("POST", "/api/product", None, &json!({"name": "Pen", "price": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_create_returns_structured_errors() {
    let (router, _, _) = build();
    let token = token("u1", None);
    let (status, body) = send(
        &router,
        with_json(
            "POST",
            "/api/product",
            Some(&token),
            &json!({"name": "", "price": -1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["field"], "name");
    assert_eq!(errors[1]["code"], "too_small");
}

#[tokio::test]
async fn client_supplied_id_is_rejected() {
    let (router, _, _) = build();
    let token = token("u1", None);
    let (status, _) = send(
        &router,
        with_json(
            "POST",
            "/api/product",
            Some(&token),
            &json!({"id": "x", "name": "Pen", "price": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_read_update_delete_cycle() {
    let (router, _, _) = build();
    let owner = token("u1", None);

    let (status, created) = send(
        &router,
        with_json(
            "POST",
            "/api/product",
            Some(&owner),
            &json!({"name": "Pen", "price": 1.5, "costBasis": 0.4}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "draft");
    assert_eq!(created["ownerId"], "u1");
    assert!(created.get("costBasis").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&router, get(&format!("/api/product/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Pen");

    // list is public and paginated
    let (status, listed) = send(&router, get("/api/product?limit=10", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["records"].as_array().unwrap().len(), 1);

    // a different non-admin user may not update
    let intruder = token("u2", None);
    let (status, _) = send(
        &router,
        with_json(
            "PATCH",
            &format!("/api/product/{id}"),
            Some(&intruder),
            &json!({"price": 0.1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &router,
        with_json(
            "PATCH",
            &format!("/api/product/{id}"),
            Some(&owner),
            &json!({"status": "listed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "listed");
    assert!(updated["updatedAt"].is_string());
    // every updated-flagged field is restamped, not just updatedAt
    assert!(updated["touchedAt"].is_string());

    // admin role satisfies the delete policy without ownership
    let admin = token("u3", Some("admin"));
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/product/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, get(&format!("/api/product/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn denied_caller_cannot_probe_record_existence() {
    let (router, _, records) = build();
    records
        .insert("invoice", json!({"id": "inv1", "amount": 10}))
        .unwrap();

    // same 403 for an existing and a missing id
    let user = token("u7", None);
    for id in ["inv1", "missing"] {
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/invoice/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {user}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // an allowed caller still sees the 404
    let admin = token("u8", Some("admin"));
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/invoice/missing")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_filter_is_422() {
    let (router, _, _) = build();
    let (status, body) = send(&router, get("/api/product?limit=500", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "limit");
}

fn seed_user(records: &MemoryRecords, id: &str, email: &str, password: &str) {
    let hash = PasswordHasher::new().hash(password).unwrap();
    records
        .insert(
            "user",
            json!({"id": id, "email": email, "password": hash}),
        )
        .unwrap();
}

#[tokio::test]
async fn login_and_refresh_flow() {
    let (router, _, records) = build();
    seed_user(&records, "u9", "ada@example.com", "hunter2");

    let (status, _) = send(
        &router,
        with_json(
            "POST",
            "/auth/login",
            None,
            &json!({"email": "ada@example.com", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, pair) = send(
        &router,
        with_json(
            "POST",
            "/auth/login",
            None,
            &json!({"email": "ada@example.com", "password": "hunter2"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(pair["accessToken"].is_string());
    let refresh_token = pair["refreshToken"].as_str().unwrap().to_string();

    let (status, renewed) = send(
        &router,
        with_json(
            "POST",
            "/auth/refresh",
            None,
            &json!({"refreshToken": refresh_token}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(renewed["accessToken"].is_string());

    // access token works for current-user and hides the password hash
    let access = pair["accessToken"].as_str().unwrap();
    let (status, user) = send(&router, get("/auth/current-user", Some(access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "ada@example.com");
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn current_user_requires_a_token() {
    let (router, _, _) = build();
    let (status, _) = send(&router, get("/auth/current-user", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (router, _, _) = build();
    let (status, doc) = send(&router, get("/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["openapi"], "3.0.3");
    assert!(doc["paths"]["/api/product"]["get"].is_object());
    assert!(doc["components"]["schemas"]["ProductCreate"].is_object());
}
