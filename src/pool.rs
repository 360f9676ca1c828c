use crate::error::PoolError;
use crate::queue::{Consumer, Producer};

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::runtime::Handle as TokioHandle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

/// A fixed-size pool of workers draining an intake queue into an outcome
/// queue.
///
/// Each worker repeatedly claims one task from the intake queue, runs the
/// processing function on it, and publishes the result to the outcome queue.
/// Workers terminate once the intake queue is closed and drained; there is no
/// other termination signal. The pool holds the only producer clones for the
/// outcome queue, so once the last worker terminates the outcome consumer
/// observes end-of-stream instead of blocking forever.
pub struct WorkerPool {
  pool_name: Arc<String>,
  worker_handles: Vec<JoinHandle<()>>,
  processed: Arc<AtomicU64>,
}

impl WorkerPool {
  /// Launches `worker_count` workers (clamped to at least 1) on the given
  /// Tokio runtime handle.
  ///
  /// The pool takes ownership of the intake consumer and the outcome
  /// producer; the caller keeps the opposite halves. `process` is shared by
  /// every worker and must therefore be `Send + Sync`. Processing order is
  /// strictly sequential within one worker; no ordering is guaranteed across
  /// workers.
  pub fn start<T, R, F, Fut>(
    worker_count: usize,
    intake: Consumer<T>,
    outcome: Producer<R>,
    tokio_handle: TokioHandle,
    pool_name: &str,
    process: F,
  ) -> Self
  where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
  {
    let pool_name = Arc::new(pool_name.to_string());
    let processed = Arc::new(AtomicU64::new(0));
    let process = Arc::new(process);
    let worker_count = worker_count.max(1);

    let mut worker_handles = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
      let worker_intake = intake.clone();
      let worker_outcome = outcome.clone();
      let worker_process = process.clone();
      let worker_processed = processed.clone();

      let handle = tokio_handle.spawn(
        Self::run_worker(worker_intake, worker_outcome, worker_process, worker_processed)
          .instrument(info_span!("pool_worker", pool = %pool_name, worker_id)),
      );
      worker_handles.push(handle);
    }

    // The pool-local `intake` and `outcome` handles drop here. From now on
    // the workers hold the only outcome producers, so the outcome stream
    // ends exactly when the last worker terminates.
    info!(pool = %pool_name, worker_count, "Worker pool started.");

    Self {
      pool_name,
      worker_handles,
      processed,
    }
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  /// Returns the number of workers this pool was started with.
  pub fn worker_count(&self) -> usize {
    self.worker_handles.len()
  }

  /// Returns the total number of results published across all workers so far.
  pub fn processed_count(&self) -> u64 {
    self.processed.load(AtomicOrdering::Relaxed)
  }

  /// Waits for every worker to terminate.
  ///
  /// Workers terminate once the intake queue is closed and drained, so this
  /// only completes after the intake producer(s) have closed. Safe to call
  /// while results are still buffered; it does not consume the outcome queue.
  ///
  /// # Errors
  /// Returns `PoolError::WorkerLost` if any worker task failed to join. A
  /// panicking processing function does not cause this (panics are contained
  /// per task); only a fault in the worker loop itself would.
  pub async fn join(self) -> Result<(), PoolError> {
    debug!(pool = %self.pool_name, "Waiting for workers to terminate.");

    let mut lost = 0usize;
    for join_result in join_all(self.worker_handles).await {
      if let Err(join_error) = join_result {
        error!(pool = %self.pool_name, "Worker failed to join: {join_error}");
        lost += 1;
      }
    }

    if lost > 0 {
      return Err(PoolError::WorkerLost);
    }
    info!(
      pool = %self.pool_name,
      processed = self.processed.load(AtomicOrdering::Relaxed),
      "All workers terminated."
    );
    Ok(())
  }

  async fn run_worker<T, R, F, Fut>(
    intake: Consumer<T>,
    outcome: Producer<R>,
    process: Arc<F>,
    processed: Arc<AtomicU64>,
  ) where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
  {
    debug!("Worker started.");

    loop {
      let task = match intake.pull().await {
        Ok(task) => task,
        Err(_) => {
          debug!("Intake queue closed and drained. Worker terminating.");
          break;
        }
      };

      trace!("Claimed task from intake queue.");
      match AssertUnwindSafe((*process)(task)).catch_unwind().await {
        Ok(result) => {
          if outcome.push(result).await.is_err() {
            warn!("Outcome queue closed while publishing a result. Worker terminating.");
            break;
          }
          processed.fetch_add(1, AtomicOrdering::Relaxed);
          trace!("Published result to outcome queue.");
        }
        Err(_panic_payload) => {
          // The task is retired without a result; the worker stays alive and
          // keeps draining the intake queue.
          error!("Processing panicked. Task retired without a result.");
        }
      }
    }
  }
}
