use std::{error::Error, fmt, sync::Arc};

use thiserror::Error;

use crate::models::JobStatus;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a berth-related operation.
pub type BerthResult<T> = Result<T, BerthError>;

/// The underlying cause carried by a [`BerthError::Dependency`].
pub type DependencyCause = Arc<dyn Error + Send + Sync>;

/// An error that occurred during a berth operation.
///
/// The error is cheap to clone so that a single outcome can be handed to every caller that
/// was coalesced onto the same in-flight operation.
#[derive(pretty_error_debug::Debug, Error, Clone)]
pub enum BerthError {
    /// The input was malformed and rejected before any work happened.
    #[error("validation error: {0}")]
    Validation(String),

    /// The container or job does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// The kind of resource that was looked up.
        kind: ResourceKind,

        /// The identifier that was looked up.
        id: String,
    },

    /// The requester is authenticated but does not own the resource.
    #[error("permission denied on {kind} {id}")]
    PermissionDenied {
        /// The kind of resource that was accessed.
        kind: ResourceKind,

        /// The identifier of the resource.
        id: String,
    },

    /// Another operation on the same container is in flight.
    #[error("conflicting operation in progress on container {0}")]
    Conflict(String),

    /// A job was asked to move to a status its current status cannot reach.
    #[error("invalid job transition from {from} to {to}")]
    InvalidJobTransition {
        /// The status the job was in.
        from: JobStatus,

        /// The status that was requested.
        to: JobStatus,
    },

    /// The container runtime or a persistence backend failed.
    #[error("dependency failure: {0}")]
    Dependency(#[source] DependencyCause),
}

/// The kind of resource an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A container managed by the runtime.
    Container,

    /// An asynchronous job record.
    Job,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl BerthError {
    /// Creates a dependency error from any error or message.
    pub fn dependency(cause: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Dependency(Arc::from(cause.into()))
    }

    /// Creates a not-found error for a container.
    pub fn container_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: ResourceKind::Container,
            id: id.into(),
        }
    }

    /// Creates a not-found error for a job.
    pub fn job_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: ResourceKind::Job,
            id: id.into(),
        }
    }

    /// Returns a short, stable category name for the error.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Conflict(_) => "conflict",
            Self::InvalidJobTransition { .. } | Self::Dependency(_) => "dependency",
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => write!(f, "container"),
            Self::Job => write!(f, "job"),
        }
    }
}

impl From<sqlx::Error> for BerthError {
    fn from(err: sqlx::Error) -> Self {
        Self::dependency(err)
    }
}

impl From<sqlx::migrate::MigrateError> for BerthError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::dependency(err)
    }
}

impl From<serde_json::Error> for BerthError {
    fn from(err: serde_json::Error) -> Self {
        Self::dependency(err)
    }
}

impl From<chrono::ParseError> for BerthError {
    fn from(err: chrono::ParseError) -> Self {
        Self::dependency(err)
    }
}
