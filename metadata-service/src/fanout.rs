//! Concurrent fan-out with a join barrier.

use std::future::Future;
use std::sync::Arc;

use common::errors::{AppError, AppResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs `task` for every item, at most `max_concurrency` at a time, and
/// returns the results in input order.
///
/// The first failure is returned immediately and the remaining tasks are
/// aborted when the set is dropped; no partial result escapes.
pub async fn fan_out<I, T, F, Fut>(items: I, max_concurrency: usize, task: F) -> AppResult<Vec<T>>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut set = JoinSet::new();
    let mut count = 0;
    for (index, item) in items.into_iter().enumerate() {
        let fut = task(item);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(format!("fan-out semaphore closed: {e}")))?;
            fut.await.map(|value| (index, value))
        });
        count += 1;
    }

    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (index, value) =
            joined.map_err(|e| AppError::Internal(format!("fan-out task failed: {e}")))??;
        slots[index] = Some(value);
    }

    Ok(slots.into_iter().flatten().collect())
}
