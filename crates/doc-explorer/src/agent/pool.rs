//! Bounded pool for blocking agent calls

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// Runs blocking closures on the blocking thread pool, at most `size` at a time
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool with `size` workers (minimum 1)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Worker count
    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run `job` once a worker is free.
    ///
    /// The job keeps its worker until it finishes, even if the returned future is dropped.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::internal(format!("Worker pool closed: {}", e)))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| Error::internal(format!("Worker failed: {}", e)))
    }
}
