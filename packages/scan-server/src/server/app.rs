//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    routing::post,
    Router,
};
use job_scanner::{ScanStore, Scanner};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::server::routes::{
    create_source_handler, get_job_handler, health_handler, list_jobs_handler,
    list_sources_handler, refresh_handler, scan_status_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scanner: Scanner,
    pub store: Arc<dyn ScanStore>,
}

impl AppState {
    pub fn new(scanner: Scanner, store: Arc<dyn ScanStore>) -> Self {
        Self { scanner, store }
    }
}

/// Build the Axum application router
///
/// An empty `allowed_origins` allows any origin (development).
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allow_origin(allowed_origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/sources", get(list_sources_handler).post(create_source_handler))
        .route("/sources/refresh", post(refresh_handler))
        .route("/sources/scan-status", get(scan_status_handler))
        .route("/jobs", get(list_jobs_handler))
        .route("/jobs/:id", get(get_job_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn allow_origin(origins: &[String]) -> AllowOrigin {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parsed)
    }
}
