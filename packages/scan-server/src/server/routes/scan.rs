use axum::{extract::Extension, http::StatusCode, Json};
use job_scanner::{ScanError, ScanStatus};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::server::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Sources to scan; all sources when absent or empty
    #[serde(default)]
    pub source_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshResponse {
    Accepted { scan_id: Uuid, sources_total: usize },
    Rejected { reason: String, message: String },
}

/// Start a background scan
///
/// 202 when accepted, 409 while a scan is running, 404 when no source
/// matches. Progress is polled via `/sources/scan-status`.
pub async fn refresh_handler(
    Extension(state): Extension<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> (StatusCode, Json<RefreshResponse>) {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    match state.scanner.start_scan(request.source_ids.as_deref()).await {
        Ok(handle) => {
            let accepted = handle.accepted().clone();
            info!(scan_id = %accepted.scan_id, sources = accepted.sources_total, "Refresh accepted");

            tokio::spawn(async move {
                match handle.wait().await {
                    Ok(report) => info!(
                        scan_id = %report.scan_id,
                        added = report.jobs_added(),
                        skipped = report.jobs_skipped(),
                        "Refresh finished"
                    ),
                    Err(e) => error!(error = %e, "Refresh task failed"),
                }
            });

            (
                StatusCode::ACCEPTED,
                Json(RefreshResponse::Accepted {
                    scan_id: accepted.scan_id,
                    sources_total: accepted.sources_total,
                }),
            )
        }
        Err(e) => {
            let code = match e {
                ScanError::AlreadyScanning => StatusCode::CONFLICT,
                ScanError::NoSources => StatusCode::NOT_FOUND,
                ScanError::Storage(_) | ScanError::TaskFailed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (
                code,
                Json(RefreshResponse::Rejected {
                    reason: e.reason().to_string(),
                    message: e.to_string(),
                }),
            )
        }
    }
}

/// Current scan progress
pub async fn scan_status_handler(Extension(state): Extension<AppState>) -> Json<ScanStatus> {
    Json(state.scanner.get_status())
}
