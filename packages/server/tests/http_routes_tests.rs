//! HTTP route tests
//!
//! Requests go through the full axum router (auth middleware, context
//! creation, handlers) via `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use exception_core::common::Role;
use exception_core::server::auth::JwtService;
use exception_core::server::build_app;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::TestHarness;

fn jwt() -> Arc<JwtService> {
    Arc::new(JwtService::new("test_secret", "test_issuer".to_string()))
}

fn app(ctx: &TestHarness) -> Router {
    build_app(ctx.deps.clone(), jwt(), Vec::new())
}

fn token(user_id: &str, roles: &[Role]) -> String {
    jwt().create_token(user_id, roles).expect("token")
}

fn post_json(uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn ingest_body(transaction_id: &str) -> Value {
    json!({
        "transactionId": transaction_id,
        "interfaceType": "ORDER",
        "operation": "CREATE_ORDER",
        "exceptionReason": "Order service returned 422",
        "severity": "HIGH",
        "category": "EXTERNAL_SERVICE",
        "customerId": "CUST-42"
    })
}

#[tokio::test]
async fn health_reports_store_and_subscriptions() {
    let ctx = TestHarness::new();

    let response = app(&ctx)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["status"], "ok");
    assert_eq!(body["subscriptions"]["active"], 0);
}

#[tokio::test]
async fn ingest_requires_service_token() {
    let ctx = TestHarness::new();

    let anonymous = app(&ctx)
        .oneshot(post_json("/api/events/exceptions", ingest_body("HTTP-1"), None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let operator = token("ops-1", &[Role::Operations]);
    let forbidden = app(&ctx)
        .oneshot(post_json(
            "/api/events/exceptions",
            ingest_body("HTTP-1"),
            Some(&operator),
        ))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ingest_creates_then_updates() {
    let ctx = TestHarness::new();
    let service = token("collector", &[Role::Admin]);

    let created = app(&ctx)
        .oneshot(post_json(
            "/api/events/exceptions",
            ingest_body("HTTP-2"),
            Some(&service),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = body_json(created).await;
    assert_eq!(body["created"], true);
    assert_eq!(body["exception"]["status"], "NEW");

    let updated = app(&ctx)
        .oneshot(post_json(
            "/api/events/exceptions",
            ingest_body("HTTP-2"),
            Some(&service),
        ))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(body_json(updated).await["created"], false);
}

#[tokio::test]
async fn invalid_ingest_is_bad_request() {
    let ctx = TestHarness::new();
    let service = token("collector", &[Role::Admin]);

    let response = app(&ctx)
        .oneshot(post_json(
            "/api/events/exceptions",
            ingest_body("not a valid id"),
            Some(&service),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSACTION_ID");
}

#[tokio::test]
async fn retry_outcome_for_unknown_exception_is_not_found() {
    let ctx = TestHarness::new();
    let service = token("executor", &[Role::Admin]);

    let response = app(&ctx)
        .oneshot(post_json(
            "/api/events/retry-outcomes",
            json!({ "transactionId": "HTTP-404", "success": true }),
            Some(&service),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "EXCEPTION_NOT_FOUND");
}

#[tokio::test]
async fn graphql_over_http_uses_bearer_identity() {
    let ctx = TestHarness::new();
    let service = token("collector", &[Role::Admin]);
    app(&ctx)
        .oneshot(post_json(
            "/api/events/exceptions",
            ingest_body("HTTP-GQL"),
            Some(&service),
        ))
        .await
        .unwrap();

    let operator = token("ops-7", &[Role::Operations]);
    let query = json!({
        "query": r#"mutation {
            retryException(input: { transactionId: "HTTP-GQL", reason: "Retry from HTTP" }) {
                success
                performedBy
                exception { status }
            }
        }"#
    });

    let response = app(&ctx)
        .oneshot(post_json("/graphql", query, Some(&operator)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let result = &body["data"]["retryException"];
    assert_eq!(result["success"], true);
    assert_eq!(result["performedBy"], "ops-7");
    assert_eq!(result["exception"]["status"], "RETRYING");
}

#[tokio::test]
async fn stream_rejects_missing_token_and_bad_filters() {
    let ctx = TestHarness::new();

    let anonymous = app(&ctx)
        .oneshot(
            Request::get("/api/streams/exceptions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let viewer = token("viewer-1", &[Role::Viewer]);
    let bad_kind = app(&ctx)
        .oneshot(
            Request::get(format!(
                "/api/streams/exceptions?token={}&kinds=DELETED",
                viewer
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bad_kind.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.hub.subscriber_count(), 0);
}
