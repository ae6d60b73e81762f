//! Per-container concurrency control.
//!
//! Two mechanisms compose into the guard around every mutating container operation:
//! - [`Coalescer`] collapses identical concurrent calls into one execution whose outcome every
//!   caller receives
//! - [`LockRegistry`] hands out one non-blocking lock per container; a busy container is reported
//!   immediately instead of queueing the caller
//!
//! Neither structure is global. The orchestrator owns one instance of each.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{BerthError, BerthResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

type InFlight = Shared<BoxFuture<'static, BerthResult<()>>>;

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Registry of per-container locks shared by every operation type.
///
/// An entry exists only while a caller holds the lock for that container.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: LockMap,
}

/// Exclusive right to mutate one container. Dropping it releases the lock and removes the
/// registry entry.
#[derive(Debug)]
pub struct ContainerLock {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
}

/// Keyed map of in-flight operations whose outcome is shared with every caller of the same key.
#[derive(Default)]
pub struct Coalescer {
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl LockRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries to lock `key` without waiting.
    ///
    /// Returns `None` if another caller holds the lock.
    pub fn try_acquire(&self, key: &str) -> Option<ContainerLock> {
        // Entries are only created, locked and removed under the map mutex.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())));

        let guard = Arc::clone(entry).try_lock_owned().ok()?;
        Some(ContainerLock {
            key: key.to_string(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        })
    }

    /// Whether `key` is currently locked.
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of containers with a registry entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContainerLock {
    /// The key this lock was acquired for.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Coalescer {
    /// Creates an empty coalescer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the future produced by `operation` under `key`, unless a call with the same key is
    /// already in flight, in which case that call's outcome is awaited and returned instead.
    ///
    /// The operation runs on its own task, so it finishes even if every caller stops waiting.
    /// The key is cleared when the operation finishes, so a later call executes afresh.
    pub async fn run<F, Fut>(&self, key: String, operation: F) -> BerthResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BerthResult<()>> + Send + 'static,
    {
        let in_flight = {
            let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match map.get(&key) {
                Some(existing) => {
                    tracing::debug!("coalescing onto in-flight operation {}", key);
                    existing.clone()
                }
                None => {
                    let shared = self.spawn(key.clone(), operation());
                    map.insert(key, shared.clone());
                    shared
                }
            }
        };

        in_flight.await
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn spawn<Fut>(&self, key: String, operation: Fut) -> InFlight
    where
        Fut: Future<Output = BerthResult<()>> + Send + 'static,
    {
        let map = Arc::clone(&self.in_flight);
        let handle = tokio::spawn(async move {
            // Cleared even if the operation panics.
            let _clear = scopeguard::guard(key, move |key| {
                map.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&key);
            });
            operation.await
        });

        async move { handle.await.unwrap_or_else(|e| Err(BerthError::dependency(e))) }
            .boxed()
            .shared()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Drop for ContainerLock {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(guard) = self.guard.take() {
            let current = locks
                .get(&self.key)
                .is_some_and(|entry| Arc::ptr_eq(entry, OwnedMutexGuard::mutex(&guard)));
            drop(guard);
            if current {
                locks.remove(&self.key);
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;

    async fn explode() -> BerthResult<()> {
        panic!("engine client bug");
    }

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let registry = LockRegistry::new();

        let lock = registry.try_acquire("c1").unwrap();
        assert_eq!(lock.key(), "c1");
        assert!(registry.is_locked("c1"));
        assert!(registry.try_acquire("c1").is_none());

        // Other containers are independent.
        assert!(registry.try_acquire("c2").is_some());

        drop(lock);
        assert!(!registry.is_locked("c1"));
        assert!(registry.try_acquire("c1").is_some());
    }

    #[test]
    fn test_entry_lives_only_while_held() {
        let registry = LockRegistry::new();
        let lock = registry.try_acquire("c1").unwrap();
        assert_eq!(registry.len(), 1);

        // A failed attempt leaves the holder's entry alone.
        assert!(registry.try_acquire("c1").is_none());
        assert_eq!(registry.len(), 1);

        drop(lock);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_many_keys_leave_no_entries_behind() {
        let registry = LockRegistry::new();
        for i in 0..1000 {
            let lock = registry.try_acquire(&format!("ghost-{}", i)).unwrap();
            drop(lock);
        }

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_coalescer_shares_one_execution() {
        let coalescer = Arc::new(Coalescer::new());
        let executions = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let leader = {
            let coalescer = coalescer.clone();
            let executions = executions.clone();
            tokio::spawn(async move {
                coalescer
                    .run("stop:c1".to_string(), move || async move {
                        executions.fetch_add(1, Ordering::SeqCst);
                        let _ = release_rx.await;
                        Err(BerthError::Conflict("c1".to_string()))
                    })
                    .await
            })
        };

        while coalescer.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        let follower = {
            let coalescer = coalescer.clone();
            let executions = executions.clone();
            tokio::spawn(async move {
                coalescer
                    .run("stop:c1".to_string(), move || async move {
                        executions.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            })
        };

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        release_tx.send(()).unwrap();

        let leader = leader.await.unwrap();
        let follower = follower.await.unwrap();
        assert!(matches!(leader, Err(BerthError::Conflict(_))));
        assert!(matches!(follower, Err(BerthError::Conflict(_))));
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_coalescer_runs_again_after_completion() {
        let coalescer = Coalescer::new();
        let executions = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let executions = executions.clone();
            coalescer
                .run("start:c1".to_string(), move || async move {
                    executions.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }

        assert_eq!(executions.load(Ordering::SeqCst), 2);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_coalescer_keys_are_independent() {
        let coalescer = Coalescer::new();
        let executions = Arc::new(AtomicUsize::new(0));

        let run = |key: &str| {
            let executions = executions.clone();
            coalescer.run(key.to_string(), move || async move {
                executions.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        let (a, b) = tokio::join!(run("start:c1"), run("stop:c1"));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_aborted_leader_still_completes_for_followers() {
        let coalescer = Arc::new(Coalescer::new());
        let finished = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let leader = {
            let coalescer = coalescer.clone();
            let finished = finished.clone();
            tokio::spawn(async move {
                coalescer
                    .run("remove:c1".to_string(), move || async move {
                        let _ = release_rx.await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            })
        };

        while coalescer.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        let follower = {
            let coalescer = coalescer.clone();
            tokio::spawn(async move {
                coalescer
                    .run("remove:c1".to_string(), || async {
                        Err(BerthError::Conflict("c1".to_string()))
                    })
                    .await
            })
        };

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());
        assert_eq!(coalescer.in_flight(), 1);

        release_tx.send(()).unwrap();
        follower.await.unwrap().unwrap();

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_operation_clears_key() {
        let coalescer = Coalescer::new();

        let result = coalescer
            .run("stop:c1".to_string(), explode)
            .await;

        assert!(matches!(result, Err(BerthError::Dependency(_))));
        assert_eq!(coalescer.in_flight(), 0);
    }
}
