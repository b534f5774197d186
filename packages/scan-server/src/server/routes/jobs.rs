use axum::{
    extract::{Extension, Path},
    Json,
};
use job_scanner::Job;

use super::ApiError;
use crate::server::app::AppState;

/// List jobs, newest first
pub async fn list_jobs_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let jobs = state.store.list_jobs().await.map_err(ApiError::internal)?;
    Ok(Json(jobs))
}

/// Get one job
pub async fn get_job_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Job>, ApiError> {
    match state.store.get_job(id).await.map_err(ApiError::internal)? {
        Some(job) => Ok(Json(job)),
        None => Err(ApiError::not_found(format!("job {} not found", id))),
    }
}
