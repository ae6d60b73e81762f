//! The container orchestrator consumed by the API layer.
//!
//! Container creation is asynchronous: [`ContainerOrchestrator::create_container`] records a
//! pending job, spawns the work on a detached task and returns the job identifier at once.
//! Callers follow progress with [`ContainerOrchestrator::get_job`]. The background work runs
//! strictly in the order create, register ownership, finalize; if registering ownership fails
//! the freshly created container is removed again before the job is marked failed.
//!
//! Start, stop and remove are synchronous and guarded. Each call is coalesced with identical
//! in-flight calls from the same requester, then takes the container's lock without waiting
//! and checks ownership before the runtime is touched. The guarded body runs on its own task,
//! so a caller that goes away cannot interrupt a remove between the runtime call and the
//! ownership update.

use std::{fmt, sync::Arc};

use futures::future;

use crate::{
    config::CONTAINER_CREATION_JOB,
    models::{Container, ContainerCreateOptions, ContainerCreation, Job, UserId},
    runtime::ContainerRuntime,
    store::{JobStore, OwnershipRegistry},
    BerthError, BerthResult, ResourceKind,
};

use super::{Coalescer, LockRegistry};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A mutating operation on an existing container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerOperation {
    /// Start the container
    Start,

    /// Stop the container
    Stop,

    /// Remove the container and its ownership record
    Remove,
}

/// Service composing the container runtime, the job store, the ownership registry and the
/// per-container guard.
///
/// Cloning is cheap and every clone shares the same guard state.
#[derive(Clone)]
pub struct ContainerOrchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    owners: Arc<dyn OwnershipRegistry>,
    jobs: Arc<dyn JobStore>,
    locks: Arc<LockRegistry>,
    coalescer: Arc<Coalescer>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ContainerOperation {
    /// The operation name used in coalescing keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Remove => "remove",
        }
    }

    /// The coalescing key for this operation on `container_id`, e.g. `stop:3f2a`.
    pub fn key(&self, container_id: &str) -> String {
        format!("{}:{}", self.as_str(), container_id)
    }
}

impl ContainerOrchestrator {
    /// Creates an orchestrator with its own lock registry and coalescer.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        owners: Arc<dyn OwnershipRegistry>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self::with_lock_registry(runtime, owners, jobs, Arc::new(LockRegistry::new()))
    }

    /// Creates an orchestrator around an existing lock registry.
    pub fn with_lock_registry(
        runtime: Arc<dyn ContainerRuntime>,
        owners: Arc<dyn OwnershipRegistry>,
        jobs: Arc<dyn JobStore>,
        locks: Arc<LockRegistry>,
    ) -> Self {
        Self {
            runtime,
            owners,
            jobs,
            locks,
            coalescer: Arc::new(Coalescer::new()),
        }
    }

    /// The lock registry guarding container operations.
    pub fn lock_registry(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    /// Accepts a container creation request and returns the identifier of the job tracking it.
    ///
    /// Only an invalid request or a failure to persist the pending job is reported here. Every
    /// later failure is recorded on the job.
    pub async fn create_container(
        &self,
        user_id: UserId,
        options: ContainerCreateOptions,
    ) -> BerthResult<String> {
        options.validate()?;

        let payload = serde_json::to_value(&options)?;
        let job = Job::new(CONTAINER_CREATION_JOB, user_id, payload);
        self.jobs.create(&job).await?;

        let job_id = job.get_id().clone();
        tracing::info!("accepted container creation job {} for user {}", job_id, user_id);

        let this = self.clone();
        tokio::spawn(async move {
            this.run_creation_job(job, user_id, options).await;
        });

        Ok(job_id)
    }

    /// Returns a job owned by `user_id`.
    pub async fn get_job(&self, user_id: UserId, job_id: &str) -> BerthResult<Job> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| BerthError::job_not_found(job_id))?;

        if *job.get_owner() != user_id {
            return Err(BerthError::PermissionDenied {
                kind: ResourceKind::Job,
                id: job_id.to_string(),
            });
        }

        Ok(job)
    }

    /// Starts a container owned by `user_id`.
    pub async fn start_container(&self, user_id: UserId, container_id: &str) -> BerthResult<()> {
        self.guarded(ContainerOperation::Start, user_id, container_id)
            .await
    }

    /// Stops a container owned by `user_id`.
    pub async fn stop_container(&self, user_id: UserId, container_id: &str) -> BerthResult<()> {
        self.guarded(ContainerOperation::Stop, user_id, container_id)
            .await
    }

    /// Removes a container owned by `user_id` and forgets its ownership record.
    ///
    /// If the runtime fails to remove the container the ownership record is kept, so the call
    /// can be retried.
    pub async fn remove_container(&self, user_id: UserId, container_id: &str) -> BerthResult<()> {
        self.guarded(ContainerOperation::Remove, user_id, container_id)
            .await
    }

    /// Lists the containers owned by `user_id`.
    ///
    /// Containers that cannot be inspected are logged and left out.
    pub async fn list_containers(&self, user_id: UserId) -> BerthResult<Vec<Container>> {
        let ids = self.owners.list_container_ids(user_id).await?;
        let inspections = future::join_all(ids.iter().map(|id| self.runtime.inspect(id))).await;

        let containers = ids
            .iter()
            .zip(inspections)
            .filter_map(|(id, inspection)| match inspection {
                Ok(container) => Some(container),
                Err(e) => {
                    tracing::warn!("skipping container {} in listing: {}", id, e);
                    None
                }
            })
            .collect();

        Ok(containers)
    }

    /// Runs `operation` through the coalescer and the per-container lock.
    ///
    /// Coalescing is scoped to the requester so that a caller only ever receives an outcome
    /// that was authorized for them.
    async fn guarded(
        &self,
        operation: ContainerOperation,
        user_id: UserId,
        container_id: &str,
    ) -> BerthResult<()> {
        let key = format!("{}/{}", user_id, operation.key(container_id));
        let this = self.clone();
        let container_id = container_id.to_string();

        self.coalescer
            .run(key, move || async move {
                this.execute_locked(operation, user_id, &container_id).await
            })
            .await
    }

    async fn execute_locked(
        &self,
        operation: ContainerOperation,
        user_id: UserId,
        container_id: &str,
    ) -> BerthResult<()> {
        let Some(_lock) = self.locks.try_acquire(container_id) else {
            tracing::info!(
                "rejecting {} on container {}: another operation is in flight",
                operation,
                container_id
            );
            return Err(BerthError::Conflict(container_id.to_string()));
        };

        self.execute(operation, user_id, container_id).await
    }

    async fn execute(
        &self,
        operation: ContainerOperation,
        user_id: UserId,
        container_id: &str,
    ) -> BerthResult<()> {
        self.authorize_container(user_id, container_id).await?;

        match operation {
            ContainerOperation::Start => self.runtime.start(container_id).await?,
            ContainerOperation::Stop => self.runtime.stop(container_id).await?,
            ContainerOperation::Remove => {
                self.runtime.remove(container_id).await?;
                self.owners.delete(container_id).await?;
            }
        }

        tracing::info!("{} container {} for user {}", operation, container_id, user_id);
        Ok(())
    }

    async fn authorize_container(&self, user_id: UserId, container_id: &str) -> BerthResult<()> {
        let owner = self
            .owners
            .get_owner(container_id)
            .await?
            .ok_or_else(|| BerthError::container_not_found(container_id))?;

        if owner != user_id {
            tracing::warn!(
                "user {} denied access to container {} owned by {}",
                user_id,
                container_id,
                owner
            );
            return Err(BerthError::PermissionDenied {
                kind: ResourceKind::Container,
                id: container_id.to_string(),
            });
        }

        Ok(())
    }

    /// Executes a creation job from `Pending` to a terminal status.
    async fn run_creation_job(&self, mut job: Job, user_id: UserId, options: ContainerCreateOptions) {
        let job_id = job.get_id().clone();

        if let Err(e) = job.mark_running() {
            tracing::error!("job {} cannot start: {}", job_id, e);
            return;
        }
        if let Err(e) = self.jobs.update(&job).await {
            tracing::error!("failed to mark job {} running, abandoning it: {}", job_id, e);
            return;
        }

        let container_id = match self.runtime.create(&options).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("job {} failed to create container: {}", job_id, e);
                self.finish_failed(job, e.to_string()).await;
                return;
            }
        };

        if let Err(e) = self.owners.create(&container_id, user_id).await {
            tracing::warn!(
                "job {} failed to register container {}: {}",
                job_id,
                container_id,
                e
            );
            // TODO: a periodic sweep comparing runtime containers with the ownership registry
            // would reclaim containers whose compensating remove also failed.
            if let Err(remove_err) = self.runtime.remove(&container_id).await {
                tracing::error!(
                    "compensating remove of container {} for job {} failed, container may be orphaned: {}",
                    container_id,
                    job_id,
                    remove_err
                );
            }
            self.finish_failed(job, e.to_string()).await;
            return;
        }

        let outcome = serde_json::to_value(ContainerCreation {
            container_id: container_id.clone(),
        })
        .map_err(|e| format!("failed to serialize job result: {}", e))
        .and_then(|result| job.complete(result).map_err(|e| e.to_string()));

        match outcome {
            Ok(()) => {
                if let Err(e) = self.jobs.update(&job).await {
                    tracing::error!("failed to mark job {} completed: {}", job_id, e);
                    return;
                }
                tracing::info!("job {} created container {}", job_id, container_id);
            }
            Err(message) => self.finish_failed(job, message).await,
        }
    }

    async fn finish_failed(&self, mut job: Job, message: String) {
        if let Err(e) = job.fail(message) {
            tracing::error!("job {} cannot be marked failed: {}", job.get_id(), e);
            return;
        }

        if let Err(e) = self.jobs.update(&job).await {
            tracing::error!("failed to mark job {} failed: {}", job.get_id(), e);
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for ContainerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for ContainerOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerOrchestrator")
            .field("locks", &self.locks)
            .field("in_flight", &self.coalescer.in_flight())
            .finish_non_exhaustive()
    }
}
