use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use getset::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{BerthError, BerthResult};

use super::UserId;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The status of a job.
///
/// Jobs move strictly along `Pending -> Running -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, no work has started yet
    Pending,

    /// The work is executing
    Running,

    /// The work and all its side effects succeeded
    Completed,

    /// A required step failed
    Failed,
}

/// A tracked unit of asynchronous work.
///
/// Status changes go through [`Job::mark_running`], [`Job::complete`] and [`Job::fail`],
/// which refuse any move the state machine does not allow. `result` is only ever set on a
/// completed job and `error` only on a failed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Job {
    /// Unique job identifier
    id: String,

    /// The kind of work, e.g. `container_creation`
    #[serde(rename = "type")]
    job_type: String,

    /// Current status
    status: JobStatus,

    /// Serialized input parameters
    payload: Value,

    /// Serialized output of a completed job
    result: Option<Value>,

    /// Failure description of a failed job
    error: Option<String>,

    /// The user that requested the work
    owner: UserId,

    /// When the job was created
    created_at: DateTime<Utc>,

    /// When the job last changed status
    updated_at: DateTime<Utc>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl JobStatus {
    /// Returns the lowercase name used in records and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a job in this status may move to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl Job {
    /// Creates a pending job with a fresh identifier.
    pub fn new(job_type: impl Into<String>, owner: UserId, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.into(),
            status: JobStatus::Pending,
            payload,
            result: None,
            error: None,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a job from persisted fields.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: String,
        job_type: String,
        status: JobStatus,
        payload: Value,
        result: Option<Value>,
        error: Option<String>,
        owner: UserId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_type,
            status,
            payload,
            result,
            error,
            owner,
            created_at,
            updated_at,
        }
    }

    /// Moves a pending job to running.
    pub fn mark_running(&mut self) -> BerthResult<()> {
        self.transition(JobStatus::Running)
    }

    /// Moves a running job to completed with its serialized result.
    pub fn complete(&mut self, result: Value) -> BerthResult<()> {
        self.transition(JobStatus::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    /// Moves a running job to failed with a description of what went wrong.
    pub fn fail(&mut self, error: impl Into<String>) -> BerthResult<()> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Whether the job has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, next: JobStatus) -> BerthResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(BerthError::InvalidJobTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        // Wall clocks can step backwards; updated_at must not.
        self.updated_at = Utc::now().max(self.updated_at);
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = BerthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(BerthError::dependency(format!(
                "unknown job status '{}'",
                other
            ))),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn running_job() -> Job {
        let mut job = Job::new("container_creation", 7, json!({ "image": "alpine:latest" }));
        job.mark_running().unwrap();
        job
    }

    #[test]
    fn test_new_job_is_pending_and_empty() {
        let job = Job::new("container_creation", 7, json!({}));

        assert_eq!(*job.get_status(), JobStatus::Pending);
        assert_eq!(*job.get_owner(), 7);
        assert!(job.get_result().is_none());
        assert!(job.get_error().is_none());
        assert_eq!(job.get_created_at(), job.get_updated_at());
        assert!(Uuid::parse_str(job.get_id()).is_ok());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = Job::new("container_creation", 1, json!({}));
        let b = Job::new("container_creation", 1, json!({}));
        assert_ne!(a.get_id(), b.get_id());
    }

    #[test]
    fn test_complete_sets_result_only() {
        let mut job = running_job();
        job.complete(json!({ "container_id": "abc" })).unwrap();

        assert_eq!(*job.get_status(), JobStatus::Completed);
        assert_eq!(job.get_result(), &Some(json!({ "container_id": "abc" })));
        assert!(job.get_error().is_none());
        assert!(job.is_terminal());
    }

    #[test]
    fn test_fail_sets_error_only() {
        let mut job = running_job();
        job.fail("image not found").unwrap();

        assert_eq!(*job.get_status(), JobStatus::Failed);
        assert_eq!(job.get_error().as_deref(), Some("image not found"));
        assert!(job.get_result().is_none());
    }

    #[test]
    fn test_cannot_skip_running() {
        let mut job = Job::new("container_creation", 1, json!({}));

        assert!(matches!(
            job.complete(json!({})),
            Err(BerthError::InvalidJobTransition {
                from: JobStatus::Pending,
                to: JobStatus::Completed,
            })
        ));
        assert!(job.fail("boom").is_err());
        assert_eq!(*job.get_status(), JobStatus::Pending);
        assert!(job.get_error().is_none());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = running_job();
        job.complete(json!({})).unwrap();

        assert!(job.fail("late failure").is_err());
        assert!(job.mark_running().is_err());
        assert!(job.complete(json!({ "again": true })).is_err());
        assert!(job.get_error().is_none());
        assert_eq!(job.get_result(), &Some(json!({})));
    }

    #[test]
    fn test_running_cannot_restart() {
        let mut job = running_job();
        assert!(job.mark_running().is_err());
    }

    #[test]
    fn test_updated_at_advances() {
        let mut job = Job::new("container_creation", 1, json!({}));
        let created = *job.get_updated_at();
        job.mark_running().unwrap();
        let running = *job.get_updated_at();
        job.complete(json!({})).unwrap();

        assert!(running >= created);
        assert!(*job.get_updated_at() >= running);
        assert_eq!(*job.get_created_at(), created);
    }

    #[test]
    fn test_status_strings() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                json!(status.as_str())
            );
        }
        assert!("paused".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_serializes_type_field() {
        let job = Job::new("container_creation", 3, json!({}));
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["type"], "container_creation");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["owner"], 3);
    }
}
