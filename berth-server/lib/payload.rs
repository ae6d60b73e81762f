//! Request and response payload definitions for the berth server.

use berth_core::models::{Container, ContainerCreateOptions, Job, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------------------------------------------------------------------
// Types: Requests
//--------------------------------------------------------------------------------------------------

/// Request payload for creating a container
#[derive(Debug, Deserialize)]
pub struct CreateContainerRequest {
    /// Image reference to create the container from
    #[serde(default)]
    pub image: String,

    /// Command to run
    #[serde(default)]
    pub cmd: Vec<String>,

    /// Environment variables as `KEY=value`
    #[serde(default)]
    pub env: Vec<String>,
}

//--------------------------------------------------------------------------------------------------
// Types: Responses
//--------------------------------------------------------------------------------------------------

/// Response returned when a creation job was accepted
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateContainerResponse {
    /// Identifier of the job tracking the creation
    pub job_id: String,
}

/// A container as reported to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ContainerResponse {
    /// Container identifier
    pub id: String,

    /// Image the container was created from
    pub image: String,

    /// Command the container runs
    pub cmd: Vec<String>,

    /// Environment variables as `KEY=value`
    pub env: Vec<String>,

    /// Engine state, e.g. `running`
    pub status: String,
}

/// A job as reported to its owner
#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponse {
    /// Job identifier
    pub id: String,

    /// Kind of work the job performs
    #[serde(rename = "type")]
    pub job_type: String,

    /// Current status
    pub status: JobStatus,

    /// Result of a completed job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error message of a failed job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job last changed
    pub updated_at: DateTime<Utc>,
}

/// Response type for regular message responses
#[derive(Debug, Serialize, Deserialize)]
pub struct RegularMessageResponse {
    /// Message indicating the status of the operation
    pub message: String,
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<CreateContainerRequest> for ContainerCreateOptions {
    fn from(request: CreateContainerRequest) -> Self {
        ContainerCreateOptions::new(request.image)
            .with_command(request.cmd)
            .with_env(request.env)
    }
}

impl From<Container> for ContainerResponse {
    fn from(container: Container) -> Self {
        Self {
            id: container.id,
            image: container.image,
            cmd: container.command,
            env: container.env,
            status: container.status,
        }
    }
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.get_id().clone(),
            job_type: job.get_job_type().clone(),
            status: *job.get_status(),
            result: job.get_result().clone(),
            error: job.get_error().clone(),
            created_at: *job.get_created_at(),
            updated_at: *job.get_updated_at(),
        }
    }
}
