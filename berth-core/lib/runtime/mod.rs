//! The container engine abstraction consumed by the orchestrator.
//!
//! The orchestrator never talks to an engine directly. It holds a [`ContainerRuntime`] and the
//! backends in this module implement it:
//! - [`DockerRuntime`] drives a Docker engine through its HTTP API
//! - [`InMemoryRuntime`] simulates an engine in process, for development and tests

mod docker;
mod memory;

use async_trait::async_trait;

use crate::{
    models::{Container, ContainerCreateOptions},
    BerthResult,
};

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use docker::*;
pub use memory::*;

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// An engine that creates, starts, stops, removes and inspects containers.
///
/// Operations on an unknown container fail with [`crate::BerthError::NotFound`]. Dropping a
/// returned future abandons the call.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Creates a container and returns its identifier. May pull the image first.
    async fn create(&self, options: &ContainerCreateOptions) -> BerthResult<String>;

    /// Starts a container.
    async fn start(&self, id: &str) -> BerthResult<()>;

    /// Stops a container.
    async fn stop(&self, id: &str) -> BerthResult<()>;

    /// Removes a container, stopping it if necessary.
    async fn remove(&self, id: &str) -> BerthResult<()>;

    /// Describes a container.
    async fn inspect(&self, id: &str) -> BerthResult<Container>;
}
