//! A Tokio-based fixed-size worker pool that drains a bounded intake queue
//! of tasks and publishes results to a bounded outcome queue, with
//! close-on-producer-done end-of-stream semantics.

mod error;
mod pool;
mod queue;

pub use error::PoolError;
pub use pool::WorkerPool;
pub use queue::{bounded, Consumer, Producer};
