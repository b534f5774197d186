use axum::{extract::Extension, http::StatusCode, Json};
use job_scanner::{NewSource, Source};
use serde::Deserialize;
use tracing::info;
use url::Url;

use super::ApiError;
use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSourceRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub filter_description: Option<String>,
}

impl CreateSourceRequest {
    fn validate(self) -> Result<NewSource, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("name is required"));
        }

        let url = Url::parse(self.url.trim())
            .map_err(|e| ApiError::bad_request(format!("invalid url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ApiError::bad_request("url must be an absolute http(s) URL"));
        }

        let source = NewSource::new(name, self.url.trim());
        Ok(match self.filter_description.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => source.with_filter(filter),
            _ => source,
        })
    }
}

/// List configured sources
pub async fn list_sources_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<Source>>, ApiError> {
    let sources = state.store.list_sources().await.map_err(ApiError::internal)?;
    Ok(Json(sources))
}

/// Create a source
pub async fn create_source_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<CreateSourceRequest>,
) -> Result<(StatusCode, Json<Source>), ApiError> {
    let new_source = request.validate()?;
    let source = state
        .store
        .create_source(new_source)
        .await
        .map_err(ApiError::internal)?;

    info!(id = source.id, name = %source.name, url = %source.url, "Source created");
    Ok((StatusCode::CREATED, Json(source)))
}
