//! SQLite storage implementation.
//!
//! A file-based storage backend using SQLite. Good for:
//! - Local development
//! - Single-server deployments
//! - Testing with persistent data

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{JobStore, SettingsStore, SourceStore};
use crate::types::{
    job::{Job, JobStatus, NewJob},
    source::{NewSource, Source},
};

const JOB_COLUMNS: &str =
    "id, url, company, title, status, score, source_id, error_message, created_at";
const SOURCE_COLUMNS: &str = "id, url, name, filter_description, last_scanned_at, created_at";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(Box::new(e))
}

fn parse_time(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp {:?}: {}", value, e)))
}

/// SQLite-based job, source and settings store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://./jobs.db` - File-based database, created if missing
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(backend)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Limited to one connection: every connection to `:memory:` opens its
    /// own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                name TEXT NOT NULL,
                filter_description TEXT,
                last_scanned_at TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                company TEXT NOT NULL,
                title TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'suggested',
                score INTEGER,
                source_id INTEGER REFERENCES sources(id),
                error_message TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// Row types for sqlx queries
#[derive(Debug, FromRow)]
struct JobRow {
    id: i64,
    url: String,
    company: String,
    title: String,
    status: String,
    score: Option<i64>,
    source_id: Option<i64>,
    error_message: Option<String>,
    created_at: String,
}

impl JobRow {
    fn into_job(self) -> StoreResult<Job> {
        let status = JobStatus::from_str(&self.status).map_err(StoreError::Corrupt)?;
        let score = self
            .score
            .map(|s| {
                u8::try_from(s)
                    .ok()
                    .filter(|s| *s <= 100)
                    .ok_or_else(|| StoreError::Corrupt(format!("invalid score: {}", s)))
            })
            .transpose()?;

        Ok(Job {
            id: self.id,
            url: self.url,
            company: self.company,
            title: self.title,
            status,
            score,
            source_id: self.source_id,
            error_message: self.error_message,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct SourceRow {
    id: i64,
    url: String,
    name: String,
    filter_description: Option<String>,
    last_scanned_at: Option<String>,
    created_at: String,
}

impl SourceRow {
    fn into_source(self) -> StoreResult<Source> {
        Ok(Source {
            id: self.id,
            url: self.url,
            name: self.name,
            filter_description: self.filter_description,
            last_scanned_at: self.last_scanned_at.as_deref().map(parse_time).transpose()?,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn find_by_urls(&self, urls: &[String]) -> StoreResult<Vec<Job>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM jobs WHERE url IN (", JOB_COLUMNS));
        let mut separated = query.separated(", ");
        for url in urls {
            separated.push_bind(url.as_str());
        }
        separated.push_unseparated(")");

        let rows = query
            .build_query_as::<JobRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn insert(&self, job: NewJob) -> StoreResult<Job> {
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (url, company, title, status, score, source_id, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.url)
        .bind(&job.company)
        .bind(&job.title)
        .bind(job.status.as_str())
        .bind(job.score.map(i64::from))
        .bind(job.source_id)
        .bind(&job.error_message)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(job.into_job(done.last_insert_rowid(), created_at)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateUrl { url: job.url })
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn get_job(&self, id: i64) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs WHERE id = ?",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC, id DESC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }
}

#[async_trait]
impl SourceStore for SqliteStore {
    async fn list_sources(&self) -> StoreResult<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(&format!(
            "SELECT {} FROM sources ORDER BY id",
            SOURCE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(SourceRow::into_source).collect()
    }

    async fn get_sources(&self, ids: &[i64]) -> StoreResult<Vec<Source>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM sources WHERE id IN (", SOURCE_COLUMNS));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows = query
            .build_query_as::<SourceRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(SourceRow::into_source).collect()
    }

    async fn create_source(&self, source: NewSource) -> StoreResult<Source> {
        let created_at = Utc::now();

        let done = sqlx::query(
            "INSERT INTO sources (url, name, filter_description, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&source.url)
        .bind(&source.name)
        .bind(&source.filter_description)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Source {
            id: done.last_insert_rowid(),
            url: source.url,
            name: source.name,
            filter_description: source.filter_description,
            last_scanned_at: None,
            created_at,
        })
    }

    async fn update_source_scanned(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let done = sqlx::query("UPDATE sources SET last_scanned_at = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if done.rows_affected() == 0 {
            return Err(StoreError::SourceNotFound { id });
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(|(value,)| value))
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}
