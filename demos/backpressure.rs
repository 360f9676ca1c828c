use taskmill::{bounded, WorkerPool};

use std::time::Duration;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::info;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Backpressure Example (intake capacity: 2) ---");

  // A fast producer feeding slow workers through a tiny intake queue: pushes
  // start suspending once the queue is full, which is the only throttling
  // mechanism the pool has.
  let (intake_tx, intake_rx) = bounded::<u64>(2);
  let (outcome_tx, outcome_rx) = bounded::<u64>(16);

  let pool = WorkerPool::start(
    2,
    intake_rx,
    outcome_tx,
    Handle::current(),
    "backpressure_pool",
    |task| async move {
      tokio::time::sleep(Duration::from_millis(250)).await;
      task * 2
    },
  );

  let num_tasks = 8u64;
  info!(
    "Submitting {} tasks through a 2-slot intake queue; later pushes should visibly stall.",
    num_tasks
  );

  let started = Instant::now();
  for task in 0..num_tasks {
    let before_push = Instant::now();
    intake_tx.push(task).await.expect("Intake queue closed unexpectedly");
    info!(
      "Pushed task {} after waiting {:?} (elapsed {:?})",
      task,
      before_push.elapsed(),
      started.elapsed()
    );
  }
  intake_tx.close();

  for _ in 0..num_tasks {
    match outcome_rx.pull().await {
      Ok(result) => info!("Received result: {}", result),
      Err(e) => info!("Outcome queue ended early: {:?}", e),
    }
  }

  pool.join().await.expect("Pool join failed");
  info!("Processed {} tasks in {:?}.", num_tasks, started.elapsed());
  info!("--- Backpressure Example End ---");
}
