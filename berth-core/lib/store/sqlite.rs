use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqlitePool,
};

use crate::{
    config::DEFAULT_DB_MAX_CONNECTIONS,
    models::{Job, JobStatus, UserId},
    BerthError, BerthResult,
};

use super::{JobStore, OwnershipRegistry};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Migrator for the berth database schema.
pub static BERTH_DB_MIGRATOR: Migrator = sqlx::migrate!("lib/store/migrations");

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A job store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

/// An ownership registry backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteOwnershipRegistry {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    job_type: String,
    status: String,
    payload: String,
    result: Option<String>,
    error: Option<String>,
    owner: i64,
    created_at: String,
    updated_at: String,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Opens the database at `db_path`, creating it if needed, and applies pending migrations.
pub async fn get_or_create_pool(db_path: &Path) -> BerthResult<SqlitePool> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(BerthError::dependency)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(DEFAULT_DB_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    BERTH_DB_MIGRATOR.run(&pool).await?;
    tracing::info!("opened database at {}", db_path.display());

    Ok(pool)
}

/// Opens a private in-memory database with the schema applied.
///
/// Every connection to `sqlite::memory:` sees its own database, so the pool holds exactly one
/// connection and never recycles it.
pub async fn memory_pool() -> BerthResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    BERTH_DB_MIGRATOR.run(&pool).await?;
    Ok(pool)
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: &str) -> BerthResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SqliteJobStore {
    /// Creates a store over an open pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SqliteOwnershipRegistry {
    /// Creates a registry over an open pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TryFrom<JobRow> for Job {
    type Error = BerthError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let result: Option<Value> = row
            .result
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Job::restore(
            row.id,
            row.job_type,
            JobStatus::from_str(&row.status)?,
            serde_json::from_str(&row.payload)?,
            result,
            row.error,
            row.owner,
            parse_timestamp(&row.created_at)?,
            parse_timestamp(&row.updated_at)?,
        ))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, job: &Job) -> BerthResult<()> {
        let result = job
            .get_result()
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, job_type, status, payload, result, error, owner, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.get_id())
        .bind(job.get_job_type())
        .bind(job.get_status().as_str())
        .bind(serde_json::to_string(job.get_payload())?)
        .bind(result)
        .bind(job.get_error().as_deref())
        .bind(job.get_owner())
        .bind(format_timestamp(job.get_created_at()))
        .bind(format_timestamp(job.get_updated_at()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> BerthResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, job_type, status, payload, result, error, owner, created_at, updated_at
            FROM jobs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn update(&self, job: &Job) -> BerthResult<()> {
        let result = job
            .get_result()
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, result = ?, error = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(job.get_status().as_str())
        .bind(result)
        .bind(job.get_error().as_deref())
        .bind(format_timestamp(job.get_updated_at()))
        .bind(job.get_id())
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(BerthError::job_not_found(job.get_id()));
        }

        Ok(())
    }
}

#[async_trait]
impl OwnershipRegistry for SqliteOwnershipRegistry {
    async fn create(&self, container_id: &str, user_id: UserId) -> BerthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO container_owners (container_id, owner, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(container_id)
        .bind(user_id)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, container_id: &str) -> BerthResult<()> {
        sqlx::query("DELETE FROM container_owners WHERE container_id = ?")
            .bind(container_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_owner(&self, container_id: &str) -> BerthResult<Option<UserId>> {
        let owner = sqlx::query_scalar::<_, i64>(
            "SELECT owner FROM container_owners WHERE container_id = ?",
        )
        .bind(container_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(owner)
    }

    async fn list_container_ids(&self, user_id: UserId) -> BerthResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT container_id FROM container_owners WHERE owner = ? ORDER BY container_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
