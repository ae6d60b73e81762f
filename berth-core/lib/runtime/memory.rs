use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{Container, ContainerCreateOptions},
    BerthError, BerthResult,
};

use super::ContainerRuntime;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const STATUS_CREATED: &str = "created";
const STATUS_RUNNING: &str = "running";
const STATUS_EXITED: &str = "exited";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A container runtime that keeps containers in memory.
///
/// Containers follow Docker's state names: `created` after create, `running` after start and
/// `exited` after stop. Starting a running container or stopping a stopped one is a no-op, as it
/// is with Docker.
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    containers: RwLock<HashMap<String, Container>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl InMemoryRuntime {
    /// Creates an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of containers that currently exist.
    pub async fn len(&self) -> usize {
        self.containers.read().await.len()
    }

    /// Whether no containers exist.
    pub async fn is_empty(&self) -> bool {
        self.containers.read().await.is_empty()
    }

    async fn set_status(&self, id: &str, status: &str) -> BerthResult<()> {
        let mut containers = self.containers.write().await;
        let container = containers
            .get_mut(id)
            .ok_or_else(|| BerthError::container_not_found(id))?;
        container.status = status.to_string();
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    async fn create(&self, options: &ContainerCreateOptions) -> BerthResult<String> {
        options.validate()?;

        let id = Uuid::new_v4().simple().to_string();
        let container = Container {
            id: id.clone(),
            image: options.image.clone(),
            command: options.command.clone(),
            env: options.env.clone(),
            status: STATUS_CREATED.to_string(),
        };

        self.containers.write().await.insert(id.clone(), container);
        tracing::debug!("created in-memory container {}", id);

        Ok(id)
    }

    async fn start(&self, id: &str) -> BerthResult<()> {
        self.set_status(id, STATUS_RUNNING).await
    }

    async fn stop(&self, id: &str) -> BerthResult<()> {
        self.set_status(id, STATUS_EXITED).await
    }

    async fn remove(&self, id: &str) -> BerthResult<()> {
        self.containers
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BerthError::container_not_found(id))
    }

    async fn inspect(&self, id: &str) -> BerthResult<Container> {
        self.containers
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| BerthError::container_not_found(id))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
