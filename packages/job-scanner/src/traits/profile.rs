//! Reference profile used for scoring.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::ProfileError;

/// Supplies the candidate profile postings are scored against.
///
/// `Ok(None)` means no profile is configured; the scan then runs without
/// scoring.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn load_profile(&self) -> Result<Option<String>, ProfileError>;
}

/// Profile read from a file (e.g. a master resume).
///
/// A missing or blank file yields no profile.
#[derive(Debug, Clone)]
pub struct FileProfile {
    path: PathBuf,
}

impl FileProfile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProfileSource for FileProfile {
    async fn load_profile(&self) -> Result<Option<String>, ProfileError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProfileError::Io {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }
}

/// Profile held in memory. `InlineProfile::none()` disables scoring.
#[derive(Debug, Clone, Default)]
pub struct InlineProfile(Option<String>);

impl InlineProfile {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Some(text.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl ProfileSource for InlineProfile {
    async fn load_profile(&self) -> Result<Option<String>, ProfileError> {
        Ok(self.0.clone())
    }
}
