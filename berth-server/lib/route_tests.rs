//! End-to-end tests driving the router with in-memory backends.

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use berth_core::{
    management::ContainerOrchestrator,
    runtime::InMemoryRuntime,
    store::{MemoryJobStore, MemoryOwnershipRegistry},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{
    auth::generate_api_key, route::create_router, state::AppState, Config, RuntimeKind,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const KEY: &str = "route-test-secret";

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn test_router() -> Router {
    let config = Config::new(
        Some(KEY.to_string()),
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        0,
        None,
        None,
        RuntimeKind::Memory,
        false,
    )
    .unwrap();

    let orchestrator = ContainerOrchestrator::new(
        Arc::new(InMemoryRuntime::new()),
        Arc::new(MemoryOwnershipRegistry::new()),
        Arc::new(MemoryJobStore::new()),
    );

    create_router(AppState::new(Arc::new(config), orchestrator))
}

fn token(user_id: i64) -> String {
    generate_api_key(KEY, user_id, chrono::Duration::hours(1)).unwrap()
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    user_id: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user_id {
        request = request.header(AUTHORIZATION, format!("Bearer {}", token(user_id)));
    }

    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

async fn create_and_wait(router: &Router, user_id: i64) -> String {
    let (status, body) = send(
        router,
        Method::POST,
        "/api/v1/containers",
        Some(user_id),
        Some(json!({ "image": "alpine:latest", "cmd": ["echo", "hello"], "env": ["GREETING=hi"] })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_uri = format!("/api/v1/jobs/{}", body["job_id"].as_str().unwrap());

    let poll = async {
        loop {
            let (status, job) = send(router, Method::GET, &job_uri, Some(user_id), None).await;
            assert_eq!(status, StatusCode::OK);
            if job["status"] == "completed" {
                return job["result"]["container_id"].as_str().unwrap().to_string();
            }
            assert_ne!(job["status"], "failed", "job failed: {}", job);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .expect("creation job did not complete")
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[tokio::test]
async fn test_health_is_public() {
    let router = test_router();
    let (status, body) = send(&router, Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Service is healthy");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let router = test_router();

    let (status, body) = send(&router, Method::GET, "/api/v1/containers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");

    let request = Request::builder()
        .uri("/api/v1/containers")
        .header(AUTHORIZATION, "Bearer berth_not.valid")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_container_lifecycle_over_http() {
    let router = test_router();
    let container_id = create_and_wait(&router, 1).await;

    let (status, listed) = send(&router, Method::GET, "/api/v1/containers", Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], container_id.as_str());
    assert_eq!(listed[0]["cmd"], json!(["echo", "hello"]));
    assert_eq!(listed[0]["env"], json!(["GREETING=hi"]));
    assert_eq!(listed[0]["image"], "alpine:latest");
    assert_eq!(listed[0]["status"], "created");

    let base = format!("/api/v1/containers/{}", container_id);

    let (status, _) = send(&router, Method::PATCH, &format!("{}/start", base), Some(1), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, Method::PATCH, &format!("{}/stop", base), Some(1), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, Method::DELETE, &base, Some(1), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, Method::DELETE, &base, Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_other_users_are_forbidden() {
    let router = test_router();
    let container_id = create_and_wait(&router, 1).await;

    let uri = format!("/api/v1/containers/{}/start", container_id);
    let (status, body) = send(&router, Method::PATCH, &uri, Some(2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "permission_denied");

    let (status, listed) = send(&router, Method::GET, "/api/v1/containers", Some(2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_job_response_shape_and_ownership() {
    let router = test_router();
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/containers",
        Some(1),
        Some(json!({ "image": "busybox" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_uri = format!("/api/v1/jobs/{}", body["job_id"].as_str().unwrap());

    let (status, job) = send(&router, Method::GET, &job_uri, Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["type"], "container_creation");
    assert!(job["created_at"].is_string());
    assert!(job.get("error").is_none());

    let (status, _) = send(&router, Method::GET, &job_uri, Some(2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&router, Method::GET, "/api/v1/jobs/missing", Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_requires_image() {
    let router = test_router();
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/containers",
        Some(1),
        Some(json!({ "cmd": ["sh"] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let router = test_router();
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/containers",
        Some(1),
        Some(json!({ "image": "alpine:latest", "cmd": "sh" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].as_str().unwrap().starts_with("invalid request"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/containers")
        .header(AUTHORIZATION, format!("Bearer {}", token(1)))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
