use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    models::{Job, UserId},
    BerthError, BerthResult,
};

use super::{JobStore, OwnershipRegistry};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A job store that keeps jobs in memory.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

/// An ownership registry that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryOwnershipRegistry {
    owners: RwLock<HashMap<String, UserId>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MemoryJobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryOwnershipRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &Job) -> BerthResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job.get_id()) {
            return Err(BerthError::dependency(format!(
                "job {} already exists",
                job.get_id()
            )));
        }

        jobs.insert(job.get_id().clone(), job.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> BerthResult<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn update(&self, job: &Job) -> BerthResult<()> {
        let mut jobs = self.jobs.write().await;
        let stored = jobs
            .get_mut(job.get_id())
            .ok_or_else(|| BerthError::job_not_found(job.get_id()))?;
        *stored = job.clone();
        Ok(())
    }
}

#[async_trait]
impl OwnershipRegistry for MemoryOwnershipRegistry {
    async fn create(&self, container_id: &str, user_id: UserId) -> BerthResult<()> {
        let mut owners = self.owners.write().await;
        if owners.contains_key(container_id) {
            return Err(BerthError::dependency(format!(
                "container {} is already registered",
                container_id
            )));
        }

        owners.insert(container_id.to_string(), user_id);
        Ok(())
    }

    async fn delete(&self, container_id: &str) -> BerthResult<()> {
        self.owners.write().await.remove(container_id);
        Ok(())
    }

    async fn get_owner(&self, container_id: &str) -> BerthResult<Option<UserId>> {
        Ok(self.owners.read().await.get(container_id).copied())
    }

    async fn list_container_ids(&self, user_id: UserId) -> BerthResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .owners
            .read()
            .await
            .iter()
            .filter(|(_, owner)| **owner == user_id)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
