// src/exec/registry.rs

//! Set of live background processes owned by the executor.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::process::ProcessHandle;

/// Background processes that are still (believed to be) running.
///
/// Shared between the executor (explicit add/remove and shutdown) and each
/// handle's exit callback (automatic removal). Every access goes through one
/// mutex, held only for the map mutation itself.
#[derive(Debug, Default)]
pub struct BackgroundRegistry {
    handles: Mutex<BTreeMap<u64, Arc<ProcessHandle>>>,
}

impl BackgroundRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, handle: Arc<ProcessHandle>) {
        let count = {
            let mut handles = self.handles.lock();
            handles.insert(handle.id(), handle);
            handles.len()
        };
        debug!(count, "added background command");
    }

    /// Remove a handle. Returns `false` if it was not registered (for
    /// example, already removed by its exit callback).
    pub fn remove(&self, handle: &ProcessHandle) -> bool {
        self.remove_id(handle.id())
    }

    pub fn remove_id(&self, id: u64) -> bool {
        let (removed, count) = {
            let mut handles = self.handles.lock();
            let removed = handles.remove(&id).is_some();
            (removed, handles.len())
        };
        if removed {
            debug!(count, "removed background command");
        }
        removed
    }

    pub fn contains(&self, handle: &ProcessHandle) -> bool {
        self.handles.lock().contains_key(&handle.id())
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable copy of the current entries.
    pub fn snapshot(&self) -> Vec<Arc<ProcessHandle>> {
        self.handles.lock().values().cloned().collect()
    }

    /// Terminate every registered handle.
    ///
    /// Works on a snapshot, since each termination triggers an asynchronous
    /// removal. Terminations run independently: a failure (or panic) in one
    /// is logged and does not stop the others. Returns how many handles were
    /// terminated successfully.
    pub async fn drain_and_terminate_all(&self) -> usize {
        let dangling = self.snapshot();
        if dangling.is_empty() {
            return 0;
        }

        warn!(count = dangling.len(), "closing dangling background command(s)");

        let mut tasks = Vec::with_capacity(dangling.len());
        for handle in dangling {
            let label = handle.to_string();
            // Out of the registry before the process is released.
            self.remove(&handle);
            let task = tokio::spawn(async move { handle.terminate().await });
            tasks.push((label, task));
        }

        let mut terminated = 0;
        for (label, task) in tasks {
            match task.await {
                Ok(result) => {
                    if result.success {
                        terminated += 1;
                    } else {
                        warn!(cmd = %label, "background command did not confirm exit");
                    }
                }
                Err(e) => {
                    error!(cmd = %label, error = %e, "terminating background command failed");
                }
            }
        }
        terminated
    }
}
