use crate::error::PoolError;

use std::fmt;

/// Creates a bounded FIFO queue, returning its producer and consumer halves.
///
/// The queue holds at most `capacity` items (clamped to at least 1). Pushing
/// into a full queue and pulling from an empty one both suspend the caller,
/// which is the only backpressure mechanism the pool relies on. Both halves
/// are cloneable, so a queue can serve multiple producers and multiple
/// consumers at once; every buffered item is claimed by exactly one consumer.
pub fn bounded<T: Send + 'static>(capacity: usize) -> (Producer<T>, Consumer<T>) {
  let (tx, rx) = kanal::bounded_async(capacity.max(1));
  (Producer { tx }, Consumer { rx })
}

/// The pushing half of a bounded queue.
///
/// The stream ends once every `Producer` clone has been closed or dropped;
/// items buffered at that point remain claimable by consumers.
pub struct Producer<T> {
  tx: kanal::AsyncSender<T>,
}

/// The pulling half of a bounded queue.
pub struct Consumer<T> {
  rx: kanal::AsyncReceiver<T>,
}

impl<T> Clone for Producer<T> {
  fn clone(&self) -> Self {
    Self { tx: self.tx.clone() }
  }
}

impl<T> Clone for Consumer<T> {
  fn clone(&self) -> Self {
    Self { rx: self.rx.clone() }
  }
}

impl<T> fmt::Debug for Producer<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Producer")
      .field("len", &self.len())
      .field("is_closed", &self.is_closed())
      .finish_non_exhaustive()
  }
}

impl<T> fmt::Debug for Consumer<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Consumer")
      .field("len", &self.len())
      .finish_non_exhaustive()
  }
}

impl<T> Producer<T> {
  /// Pushes one item into the queue, suspending while the queue is full.
  ///
  /// # Errors
  /// Returns `PoolError::QueueClosed` if every consumer has been dropped;
  /// the item is lost in that case.
  pub async fn push(&self, item: T) -> Result<(), PoolError> {
    self.tx.send(item).await.map_err(|_| PoolError::QueueClosed)
  }

  /// Closes this producer handle, consuming it.
  ///
  /// Consumers observe end-of-stream (`PoolError::QueueDrained`) once every
  /// producer clone has been closed or dropped *and* the buffer is empty.
  /// Closing does not discard buffered items.
  pub fn close(self) {
    // Dropping the sender is the close operation. kanal's own `close()` is
    // deliberately not used: it tears the channel down and discards items
    // that were pushed but not yet claimed.
    drop(self.tx);
  }

  /// Returns the number of items currently buffered in the queue.
  pub fn len(&self) -> usize {
    self.tx.len()
  }

  /// Returns `true` if no items are currently buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns `true` if the queue can no longer accept pushes, either because
  /// it was torn down or because every consumer has been dropped.
  pub fn is_closed(&self) -> bool {
    // `is_disconnected()` also covers the all-consumers-dropped state, which
    // is when `push` starts failing; `is_closed()` only reflects an explicit
    // channel teardown.
    self.tx.is_disconnected()
  }
}

impl<T> Consumer<T> {
  /// Claims the next item from the queue, suspending while the queue is
  /// empty but still open.
  ///
  /// # Errors
  /// Returns `PoolError::QueueDrained` once the queue is closed and every
  /// buffered item has been claimed. This is the end-of-stream marker; a
  /// consumer loop terminates on it instead of blocking forever.
  pub async fn pull(&self) -> Result<T, PoolError> {
    self.rx.recv().await.map_err(|_| PoolError::QueueDrained)
  }

  /// Returns the number of items currently buffered in the queue.
  pub fn len(&self) -> usize {
    self.rx.len()
  }

  /// Returns `true` if no items are currently buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_push_pull_fifo() {
    let (producer, consumer) = bounded::<u64>(4);

    producer.push(1).await.unwrap();
    producer.push(2).await.unwrap();
    assert_eq!(producer.len(), 2);

    assert_eq!(consumer.pull().await.unwrap(), 1);
    assert_eq!(consumer.pull().await.unwrap(), 2);
    assert!(consumer.is_empty());
  }

  #[tokio::test]
  async fn test_capacity_blocks_push() {
    let (producer, consumer) = bounded::<u64>(1);

    producer.push(1).await.unwrap();

    // The next push should suspend until a slot frees up.
    let push_future = producer.push(2);
    tokio::pin!(push_future);

    tokio::select! {
      _ = &mut push_future => {
        panic!("Push should have blocked because the queue is full.");
      },
      _ = tokio::time::sleep(Duration::from_millis(50)) => {
        // Expected outcome.
      }
    }

    assert_eq!(consumer.pull().await.unwrap(), 1);
    tokio::time::timeout(Duration::from_millis(50), push_future)
      .await
      .expect("Push did not complete after a slot was freed.")
      .unwrap();
    assert_eq!(consumer.pull().await.unwrap(), 2);
  }

  #[tokio::test]
  async fn test_close_drains_then_ends_stream() {
    let (producer, consumer) = bounded::<u64>(4);

    producer.push(1).await.unwrap();
    producer.push(2).await.unwrap();
    producer.close();

    // Buffered items survive the close and are still claimable.
    assert_eq!(consumer.pull().await.unwrap(), 1);
    assert_eq!(consumer.pull().await.unwrap(), 2);

    // Then the end-of-stream marker, not a hang.
    assert_eq!(consumer.pull().await, Err(PoolError::QueueDrained));
  }

  #[tokio::test]
  async fn test_stream_ends_only_after_last_producer_closes() {
    let (producer, consumer) = bounded::<u64>(4);
    let second_producer = producer.clone();

    producer.push(1).await.unwrap();
    producer.close();

    assert_eq!(consumer.pull().await.unwrap(), 1);

    // A clone is still open, so the stream has not ended yet.
    let pull_future = consumer.pull();
    tokio::pin!(pull_future);
    tokio::select! {
      _ = &mut pull_future => {
        panic!("Pull should have blocked while a producer clone is open.");
      },
      _ = tokio::time::sleep(Duration::from_millis(50)) => {}
    }

    second_producer.push(2).await.unwrap();
    assert_eq!(
      tokio::time::timeout(Duration::from_millis(50), pull_future)
        .await
        .expect("Pull did not complete after a push.")
        .unwrap(),
      2
    );

    second_producer.close();
    assert_eq!(consumer.pull().await, Err(PoolError::QueueDrained));
  }

  #[tokio::test]
  async fn test_push_fails_after_all_consumers_dropped() {
    let (producer, consumer) = bounded::<u64>(2);
    drop(consumer);

    assert!(producer.is_closed());
    assert_eq!(producer.push(1).await, Err(PoolError::QueueClosed));
  }

  #[tokio::test]
  async fn test_zero_capacity_is_clamped() {
    let (producer, consumer) = bounded::<u64>(0);

    // One slot is available despite the requested capacity of zero.
    producer.push(1).await.unwrap();
    assert_eq!(consumer.pull().await.unwrap(), 1);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_pushes_all_arrive() {
    let (producer, consumer) = bounded::<u64>(4);
    let num_items: u64 = 20;
    let claimed_count = Arc::new(AtomicUsize::new(0));

    let producer_handle = {
      let producer = producer.clone();
      tokio::spawn(async move {
        let mut handles = Vec::new();
        for i in 0..num_items {
          let p = producer.clone();
          handles.push(tokio::spawn(async move {
            p.push(i).await.unwrap();
          }));
        }
        for handle in handles {
          handle.await.unwrap();
        }
      })
    };

    let consumer_handle = {
      let claimed_count = claimed_count.clone();
      tokio::spawn(async move {
        for _ in 0..num_items {
          if consumer.pull().await.is_ok() {
            claimed_count.fetch_add(1, Ordering::SeqCst);
          }
        }
      })
    };

    producer_handle.await.unwrap();
    consumer_handle.await.unwrap();

    assert_eq!(claimed_count.load(Ordering::SeqCst), num_items as usize);
    assert!(producer.is_empty());
  }
}
