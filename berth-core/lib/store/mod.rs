//! Persistence for jobs and container ownership.
//!
//! Both stores are traits so the orchestrator can run against any backend:
//! - In-memory maps, for tests and for running without a database
//! - SQLite through `sqlx`, with embedded migrations

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::{
    models::{Job, UserId},
    BerthResult,
};

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use memory::*;
pub use sqlite::*;

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Durable mapping from job identifier to job record.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persists a new job. Fails if a job with the same identifier exists.
    async fn create(&self, job: &Job) -> BerthResult<()>;

    /// Looks a job up by identifier.
    async fn get(&self, id: &str) -> BerthResult<Option<Job>>;

    /// Replaces a stored job with `job`. Fails with not-found if it was never created.
    async fn update(&self, job: &Job) -> BerthResult<()>;
}

/// Durable mapping from container identifier to the owning user.
#[async_trait]
pub trait OwnershipRegistry: Send + Sync {
    /// Records that `user_id` owns `container_id`. Fails if the container is already owned.
    async fn create(&self, container_id: &str, user_id: UserId) -> BerthResult<()>;

    /// Forgets a container. Deleting an unknown container is not an error.
    async fn delete(&self, container_id: &str) -> BerthResult<()>;

    /// Returns the owner of a container, if it is registered.
    async fn get_owner(&self, container_id: &str) -> BerthResult<Option<UserId>>;

    /// Returns every container owned by `user_id`, sorted by identifier.
    async fn list_container_ids(&self, user_id: UserId) -> BerthResult<Vec<String>>;
}
