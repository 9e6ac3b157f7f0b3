use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use sitewright_core::github::{RepoManager, RepoPolicies};
use sitewright_core::testing::{sample_request, InMemoryRepoApi, ScriptedProvider};
use sitewright_core::{CallbackNotifier, ProviderChain, TaskPipeline};
use sitewright_server::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "s3cret";

fn state(api: Arc<InMemoryRepoApi>) -> AppState {
    let providers = ProviderChain::new(vec![
        Arc::new(ScriptedProvider::succeeding("primary", "<p>ok</p>")),
        Arc::new(ScriptedProvider::failing("secondary")),
    ]);
    let repos = RepoManager::new(api)
        .with_policies(RepoPolicies::default().with_timing(Duration::from_millis(1), false));
    let notifier = CallbackNotifier::new(Duration::from_secs(1))
        .unwrap()
        .with_max_attempts(1);
    AppState::new(TaskPipeline::new(providers, repos, notifier), SECRET, 100)
}

fn app() -> axum::Router {
    build_router(state(Arc::new(InMemoryRepoApi::new("octo"))))
}

fn post_task(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api-endpoint")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn task_json() -> serde_json::Value {
    serde_json::to_value(sample_request("http://127.0.0.1:9/notify")).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_root_metadata() {
    let response = app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "sitewright");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_provider_health() {
    let response = app().oneshot(get("/health/providers")).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["providers"]["primary"], true);
    assert_eq!(body["providers"]["secondary"], false);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let mut task = task_json();
    task["secret"] = "s3creT".into();

    let response = app().oneshot(post_task(task.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, serde_json::json!({"detail": "Invalid secret"}));
}

#[tokio::test]
async fn test_malformed_body_is_unprocessable() {
    let response = app().oneshot(post_task("{\"email\": 1".to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json_body(response).await["detail"].is_string());

    let mut task = task_json();
    task.as_object_mut().unwrap().remove("brief");
    let response = app().oneshot(post_task(task.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_invariant_violation_is_unprocessable() {
    let mut task = task_json();
    task["round"] = 4.into();
    let response = app().oneshot(post_task(task.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let detail = json_body(response).await["detail"].as_str().unwrap_or_default().to_string();
    assert!(detail.contains("round"));

    let mut task = task_json();
    task["task"] = "Not A Repo".into();
    let response = app().oneshot(post_task(task.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_accepted_task_runs_in_background() {
    let api = Arc::new(InMemoryRepoApi::new("octo"));
    let app = build_router(state(api.clone()));

    let response = app.oneshot(post_task(task_json().to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"status": "accepted", "message": "Request received, processing"})
    );

    let mut committed = false;
    for _ in 0..100 {
        if api.file("counter-app-1a2b", "index.html").is_some() {
            committed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(committed, "pipeline did not commit in time");
    assert_eq!(api.file("counter-app-1a2b", "index.html").as_deref(), Some("<p>ok</p>"));
}
