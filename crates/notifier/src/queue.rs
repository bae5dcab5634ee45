//! Pending notification store.
//!
//! Tasks are keyed by a caller-chosen name ("what kind of event"). A second
//! enqueue under a name that is still pending is a no-op: the first payload
//! wins until the task has been flushed.
//!
//! The lock is only held for map operations. A drain takes a snapshot,
//! releases the lock, performs the sends, then re-locks to put failed tasks
//! back. Producers never wait on network I/O.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kodi_common::types::JsonRpcRequest;

/// A queued request plus the number of failed send attempts so far.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTask {
    pub request: JsonRpcRequest,
    pub attempts: u32,
}

impl PendingTask {
    pub fn new(request: JsonRpcRequest) -> Self {
        Self {
            request,
            attempts: 0,
        }
    }
}

/// Result of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Delivered and removed.
    pub sent: usize,
    /// Failed, put back for the next cycle.
    pub requeued: usize,
    /// Failed for the last allowed time and discarded.
    pub dropped: usize,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.requeued + self.dropped
    }
}

/// Keyed, deduplicating task queue shared between producers and the flush loop.
#[derive(Debug, Default)]
pub struct NotifyQueue {
    tasks: Mutex<HashMap<String, PendingTask>>,
}

impl NotifyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // The map only holds plain data, so a panic elsewhere can't leave it torn.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `request` under `name` unless that name is already pending.
    ///
    /// Returns `true` if the request was stored, `false` if an earlier one was kept.
    pub fn enqueue(&self, name: impl Into<String>, request: JsonRpcRequest) -> bool {
        let mut tasks = self.lock();
        let name = name.into();
        if tasks.contains_key(&name) {
            return false;
        }
        tasks.insert(name, PendingTask::new(request));
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Pending task names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<PendingTask> {
        self.lock().get(name).cloned()
    }

    /// Remove and return everything that is currently pending.
    pub fn take_all(&self) -> Vec<(String, PendingTask)> {
        self.lock().drain().collect()
    }

    /// Put a failed task back.
    ///
    /// If a fresh task with the same name was enqueued while this one was in
    /// flight, the fresh one is kept and this one is discarded. Returns whether
    /// the task was reinserted.
    pub fn requeue(&self, name: String, task: PendingTask) -> bool {
        let mut tasks = self.lock();
        if tasks.contains_key(&name) {
            return false;
        }
        tasks.insert(name, task);
        true
    }

    /// Send every pending task once via `send`.
    ///
    /// Successful tasks are gone afterwards. A failed task is retried on a
    /// later drain until it has failed `max_attempts` times, then dropped.
    /// One failure never stops the rest of the drain.
    pub async fn drain_with<F, Fut, E>(&self, max_attempts: u32, mut send: F) -> DrainReport
    where
        F: FnMut(JsonRpcRequest) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let batch = self.take_all();
        let mut report = DrainReport::default();

        tracing::debug!(queue_size = batch.len(), "kodi request queue size");

        for (name, mut task) in batch {
            match send(task.request.clone()).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    task.attempts += 1;
                    if task.attempts >= max_attempts.max(1) {
                        tracing::warn!(
                            task = %name,
                            method = %task.request.method,
                            attempts = task.attempts,
                            error = %e,
                            "Dropping kodi task after repeated failures"
                        );
                        report.dropped += 1;
                    } else {
                        let method = task.request.method.clone();
                        let attempts = task.attempts;
                        if self.requeue(name.clone(), task) {
                            tracing::warn!(
                                task = %name,
                                method = %method,
                                attempts,
                                error = %e,
                                "Kodi request failed, will retry next cycle"
                            );
                            report.requeued += 1;
                        } else {
                            tracing::debug!(
                                task = %name,
                                method = %method,
                                error = %e,
                                "Failed kodi task superseded by a newer enqueue"
                            );
                            report.dropped += 1;
                        }
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn scan() -> JsonRpcRequest {
        JsonRpcRequest::new("VideoLibrary.Scan")
    }

    #[test]
    fn test_duplicate_name_keeps_first_payload() {
        let queue = NotifyQueue::new();
        let first = scan().with_params(json!({"directory": "/movies/"}));
        let second = scan().with_params(json!({"directory": "/tv/"}));

        assert!(queue.enqueue("library-scan", first.clone()));
        assert!(!queue.enqueue("library-scan", second));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get("library-scan").unwrap().request, first);
    }

    #[test]
    fn test_take_all_empties_queue() {
        let queue = NotifyQueue::new();
        queue.enqueue("scan", scan());
        queue.enqueue("clean", JsonRpcRequest::new("VideoLibrary.Clean"));

        let mut taken: Vec<String> = queue.take_all().into_iter().map(|(n, _)| n).collect();
        taken.sort();

        assert_eq!(taken, vec!["clean", "scan"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_requeue_yields_to_fresh_task() {
        let queue = NotifyQueue::new();
        queue.enqueue("scan", scan());
        let (name, stale) = queue.take_all().pop().unwrap();

        let fresh = scan().with_params(json!({"directory": "/new/"}));
        queue.enqueue("scan", fresh.clone());

        assert!(!queue.requeue(name, stale));
        assert_eq!(queue.get("scan").unwrap().request, fresh);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let queue = Arc::new(NotifyQueue::new());
        queue.enqueue("scan", scan());

        let q = Arc::clone(&queue);
        let result = std::thread::spawn(move || {
            let _guard = q.tasks.lock().unwrap();
            panic!("panic while holding the queue lock");
        })
        .join();
        assert!(result.is_err());
        assert!(queue.tasks.is_poisoned());

        assert!(queue.enqueue("clean", JsonRpcRequest::new("VideoLibrary.Clean")));
        assert_eq!(queue.len(), 2);

        let mut taken: Vec<String> = queue.take_all().into_iter().map(|(n, _)| n).collect();
        taken.sort();
        assert_eq!(taken, vec!["clean", "scan"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_superseded_failure_counts_as_dropped() {
        let queue = Arc::new(NotifyQueue::new());
        queue.enqueue("scan", scan());

        let fresh = scan().with_params(json!({"directory": "/new/"}));
        let q = Arc::clone(&queue);
        let f = fresh.clone();
        let report = queue
            .drain_with(3, move |_req| {
                // Same name re-enqueued while the old task is in flight
                q.enqueue("scan", f.clone());
                async { Err::<(), String>("500 Internal Server Error".to_string()) }
            })
            .await;

        assert_eq!(report, DrainReport { sent: 0, requeued: 0, dropped: 1 });
        let pending = queue.get("scan").unwrap();
        assert_eq!(pending.request, fresh);
        assert_eq!(pending.attempts, 0);
    }

    #[test]
    fn test_concurrent_enqueue_distinct_names() {
        let queue = Arc::new(NotifyQueue::new());

        let handles: Vec<_> = (0..16)
            .map(|t| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| queue.enqueue(format!("task-{t}-{i}"), scan()))
                        .all(|accepted| accepted)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(queue.len(), 16 * 50);
    }

    #[tokio::test]
    async fn test_drain_removes_successful_tasks() {
        let queue = NotifyQueue::new();
        queue.enqueue("scan", scan());
        queue.enqueue("clean", JsonRpcRequest::new("VideoLibrary.Clean"));

        let mut seen = Vec::new();
        let report = queue
            .drain_with(3, |req| {
                seen.push(req.method.clone());
                async { Ok::<(), String>(()) }
            })
            .await;

        seen.sort();
        assert_eq!(seen, vec!["VideoLibrary.Clean", "VideoLibrary.Scan"]);
        assert_eq!(report, DrainReport { sent: 2, requeued: 0, dropped: 0 });
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_drain_failure_is_bounded() {
        let queue = NotifyQueue::new();
        queue.enqueue("scan", scan());
        queue.enqueue("clean", JsonRpcRequest::new("VideoLibrary.Clean"));

        let fail_scan = |req: JsonRpcRequest| async move {
            if req.method == "VideoLibrary.Scan" {
                Err("500 Internal Server Error".to_string())
            } else {
                Ok(())
            }
        };

        let first = queue.drain_with(2, fail_scan).await;
        assert_eq!(first, DrainReport { sent: 1, requeued: 1, dropped: 0 });
        assert_eq!(queue.get("scan").unwrap().attempts, 1);

        let second = queue.drain_with(2, fail_scan).await;
        assert_eq!(second, DrainReport { sent: 0, requeued: 0, dropped: 1 });
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_is_not_blocked() {
        let queue = Arc::new(NotifyQueue::new());
        queue.enqueue("scan", scan());

        let q = Arc::clone(&queue);
        let report = queue
            .drain_with(3, move |_req| {
                // Lock is released while sending
                let accepted = q.enqueue("clean", JsonRpcRequest::new("VideoLibrary.Clean"));
                async move {
                    assert!(accepted);
                    Ok::<(), String>(())
                }
            })
            .await;

        assert_eq!(report.sent, 1);
        assert_eq!(queue.names(), vec!["clean"]);
    }
}
