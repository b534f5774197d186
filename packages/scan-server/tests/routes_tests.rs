//! Route tests against an in-memory store and mock collaborators.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use job_scanner::{
    testing::{MockExtractor, MockFetcher},
    DiscoveredPosting, JobStore, MemoryStore, NewJob, NewSource, ScanConfig, ScanDeps, Scanner,
    SourceStore,
};
use scan_server::server::{build_app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app(store: &Arc<MemoryStore>, fetcher: MockFetcher, extractor: MockExtractor) -> (Router, Scanner) {
    let deps = ScanDeps::new(store.clone(), Arc::new(fetcher), Arc::new(extractor));
    let config = ScanConfig::default().with_job_start_delay(Duration::ZERO);
    let scanner = Scanner::new(deps, config);
    let app = build_app(AppState::new(scanner.clone(), store.clone()), &[]);
    (app, scanner)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_until_idle(scanner: &Scanner) {
    for _ in 0..200 {
        if !scanner.get_status().is_scanning {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scan did not finish");
}

#[tokio::test]
async fn test_health() {
    let store = Arc::new(MemoryStore::new());
    let (app, _) = test_app(&store, MockFetcher::new(), MockExtractor::new());

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["scanning"], false);
}

#[tokio::test]
async fn test_create_and_list_sources() {
    let store = Arc::new(MemoryStore::new());
    let (app, _) = test_app(&store, MockFetcher::new(), MockExtractor::new());

    let response = app
        .clone()
        .oneshot(post_json(
            "/sources",
            json!({"name": "Board", "url": "https://b.com/search", "filter_description": "Rust"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["filter_description"], "Rust");

    let response = app
        .clone()
        .oneshot(post_json("/sources", json!({"name": "Bad", "url": "ftp://b.com"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/sources")).await.unwrap();
    let sources = body_json(response).await;
    assert_eq!(sources.as_array().unwrap().len(), 1);
    assert_eq!(sources[0]["name"], "Board");
}

#[tokio::test]
async fn test_refresh_without_sources_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let (app, _) = test_app(&store, MockFetcher::new(), MockExtractor::new());

    let response = app.oneshot(post_empty("/sources/refresh")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["reason"], "no_sources");
}

#[tokio::test]
async fn test_refresh_runs_scan_in_background() {
    let store = Arc::new(MemoryStore::new());
    store
        .create_source(NewSource::new("Board", "https://b.com/search"))
        .await
        .unwrap();

    let fetcher = MockFetcher::new().with_page("https://b.com/search", "page");
    let extractor = MockExtractor::new().with_postings(
        "page",
        vec![DiscoveredPosting::new("Rust Dev", "Acme", "/jobs/1")],
    );
    let (app, scanner) = test_app(&store, fetcher, extractor);

    let response = app.clone().oneshot(post_empty("/sources/refresh")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["sources_total"], 1);

    wait_until_idle(&scanner).await;

    let status = body_json(app.clone().oneshot(get("/sources/scan-status")).await.unwrap()).await;
    assert_eq!(status["is_scanning"], false);
    assert_eq!(status["sources_completed"], 1);
    assert_eq!(status["source_results"][0]["jobs_added"], 1);

    let jobs = body_json(app.oneshot(get("/jobs")).await.unwrap()).await;
    assert_eq!(jobs[0]["url"], "https://b.com/jobs/1");
    assert_eq!(jobs[0]["status"], "suggested");
}

#[tokio::test]
async fn test_refresh_rejected_while_scanning() {
    let store = Arc::new(MemoryStore::new());
    let source = store
        .create_source(NewSource::new("Slow", "https://slow.com/search"))
        .await
        .unwrap();

    let fetcher = MockFetcher::new()
        .with_latency(Duration::from_millis(200))
        .with_page("https://slow.com/search", "page");
    let (app, scanner) = test_app(&store, fetcher, MockExtractor::new());

    let first = app
        .clone()
        .oneshot(post_json("/sources/refresh", json!({"source_ids": [source.id]})))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = app.oneshot(post_empty("/sources/refresh")).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["reason"], "already_scanning");

    wait_until_idle(&scanner).await;
}

#[tokio::test]
async fn test_get_job() {
    let store = Arc::new(MemoryStore::new());
    let job = store
        .insert(NewJob::new("https://b.com/jobs/7", "Acme", "Engineer"))
        .await
        .unwrap();
    let (app, _) = test_app(&store, MockFetcher::new(), MockExtractor::new());

    let response = app.clone().oneshot(get(&format!("/jobs/{}", job.id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Engineer");

    let response = app.oneshot(get("/jobs/9999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
