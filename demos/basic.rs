use taskmill::{bounded, WorkerPool};

use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn double_task(task: u64) -> u64 {
  info!("Processing task {} (simulated 100ms of work)", task);
  tokio::time::sleep(Duration::from_millis(100)).await;
  task * 2
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false) // Disable module paths for cleaner example output
    .init();

  info!("--- Basic Usage Example ---");

  let (intake_tx, intake_rx) = bounded::<u64>(5);
  let (outcome_tx, outcome_rx) = bounded::<u64>(5);

  let pool = WorkerPool::start(
    3, // Worker count
    intake_rx,
    outcome_tx,
    Handle::current(),
    "basic_pool",
    |task| async move { double_task(task).await },
  );

  for task in 1..=5u64 {
    info!("Submitting task {}", task);
    if let Err(e) = intake_tx.push(task).await {
      tracing::error!("Failed to submit task {}: {:?}", task, e);
    }
  }

  info!("All tasks submitted. Closing the intake queue.");
  intake_tx.close();

  // Five tasks in, five results out. Arrival order across workers is not
  // guaranteed.
  for _ in 0..5 {
    match outcome_rx.pull().await {
      Ok(result) => info!("Received result: {}", result),
      Err(e) => info!("Outcome queue ended early: {:?}", e),
    }
  }

  pool.join().await.expect("Pool join failed");
  info!("Pool fully drained and joined.");
  info!("--- Basic Usage Example End ---");
}
