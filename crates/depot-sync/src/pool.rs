use std::future::Future;

use tokio::task::JoinSet;
use tracing::warn;

use crate::error::{SyncError, SyncResult};

/// Run `f` over `items` with at most `limit` tasks in flight.
///
/// Tasks start in input order and results come back in input order. A task
/// that panics yields `Err(SyncError::Task)` in its slot. A `limit` of zero
/// is treated as one.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<SyncResult<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let limit = limit.max(1);
    let mut results: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
    let mut workers = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        if workers.len() >= limit {
            join_one(&mut workers, &mut results).await;
        }
        let task = f(item);
        workers.spawn(async move { (index, task.await) });
    }
    while !workers.is_empty() {
        join_one(&mut workers, &mut results).await;
    }

    results
        .into_iter()
        .map(|slot| slot.ok_or_else(|| SyncError::Task("worker did not complete".into())))
        .collect()
}

async fn join_one<R: Send + 'static>(
    workers: &mut JoinSet<(usize, R)>,
    results: &mut [Option<R>],
) {
    match workers.join_next().await {
        Some(Ok((index, value))) => results[index] = Some(value),
        Some(Err(e)) => warn!(error = %e, "worker task failed"),
        None => {}
    }
}
