use thiserror::Error;

/// Errors that can occur within the `taskmill` pool and its queues.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
  /// Pushing failed because every consumer of the queue is gone.
  #[error("Queue is closed, item could not be pushed")]
  QueueClosed,

  /// Pulling failed because the queue is closed and every buffered item has
  /// already been claimed. This is the end-of-stream marker.
  #[error("Queue is closed and fully drained")]
  QueueDrained,

  /// A worker task could not be joined (its body panicked or was aborted).
  #[error("A pool worker terminated abnormally")]
  WorkerLost,
}
