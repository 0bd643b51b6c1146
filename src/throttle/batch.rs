use futures::{future::join_all, stream, Stream, StreamExt};
use itertools::Itertools;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Runs a known fan-out in fixed-size batches separated by a fixed pause.
///
/// At most `batch_size` tasks are in flight at once, and at most `batch_size`
/// are started per `delay`.
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    batch_size: usize,
    delay: Duration,
}

impl BatchScheduler {
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        BatchScheduler {
            batch_size: batch_size.max(1),
            delay,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches needed for `items` tasks.
    pub fn batches(&self, items: usize) -> usize {
        (items + self.batch_size - 1) / self.batch_size
    }

    /// Lazily run `task` over `items`, one batch at a time.
    ///
    /// Tasks of a batch run concurrently and are awaited together. The pause
    /// happens between batches, not after the last one. Outputs come out in
    /// the order of `items`.
    pub fn process<I, T, F, Fut>(&self, items: Vec<I>, task: F) -> impl Stream<Item = T>
    where
        F: Fn(I) -> Fut + Clone,
        Fut: Future<Output = T>,
    {
        let delay = self.delay;
        let total = self.batches(items.len());
        let batches: Vec<Vec<I>> = items
            .into_iter()
            .chunks(self.batch_size)
            .into_iter()
            .map(|batch| batch.collect())
            .collect();

        stream::iter(batches.into_iter().enumerate())
            .then(move |(index, batch)| {
                let task = task.clone();
                async move {
                    if index > 0 {
                        sleep(delay).await;
                    }
                    debug!(batch = index + 1, total, size = batch.len(), "running batch");
                    join_all(batch.into_iter().map(task)).await
                }
            })
            .flat_map(stream::iter)
    }
}
