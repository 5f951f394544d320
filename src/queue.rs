//! Dual-priority execution queue.
//!
//! Two lanes share one statistics block. The high lane runs work
//! immediately in the caller's own task, with no buffering and no upper
//! bound; concurrency limits belong to downstream collaborators. The low
//! lane is a strict FIFO drained by a single background worker, one task
//! at a time, with a fixed pause between tasks so scheduled patrol work
//! never monopolizes shared resources.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::future::BoxFuture;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::config::DRAIN_PAUSE;

/// A unit of work owned by the queue from enqueue to completion.
pub struct ExecutionTask {
    pub id: String,
    pub name: String,
    work: Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>,
    enqueued_at: Instant,
}

impl ExecutionTask {
    pub fn new<F, Fut>(id: impl Into<String>, name: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        ExecutionTask {
            id: id.into(),
            name: name.into(),
            work: Box::new(move || Box::pin(work())),
            enqueued_at: Instant::now(),
        }
    }
}

impl std::fmt::Debug for ExecutionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Point-in-time snapshot of the queue counters.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub high_priority_running: usize,
    pub low_priority_queue_length: usize,
    pub low_priority_draining: bool,
    pub total_executed: usize,
    pub total_failed: usize,
}

/// A task still waiting in the low-priority lane.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedTaskInfo {
    pub id: String,
    pub name: String,
    pub waited_ms: u64,
}

/// Two-lane scheduler: unthrottled interactive work, strictly serial
/// batch work.
///
/// Construct one per process and pass it by reference; the drain worker
/// is spawned at construction and stopped with [`shutdown`].
///
/// [`shutdown`]: ExecutionQueue::shutdown
pub struct ExecutionQueue {
    queue: Mutex<VecDeque<ExecutionTask>>,
    wake: Notify,
    idle: Notify,
    draining: AtomicBool,
    high_priority_running: AtomicUsize,
    total_executed: AtomicUsize,
    total_failed: AtomicUsize,
    drain_pause: Duration,
    shutdown: CancellationToken,
}

/// Decrements the running counter when dropped, so the count stays
/// correct on success, failure, and panic alike.
struct CounterGuard<'a>(&'a AtomicUsize);

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ExecutionQueue {
    pub fn new() -> Arc<Self> {
        Self::with_drain_pause(DRAIN_PAUSE)
    }

    /// Queue with a custom inter-task pause (tests and fast-draining
    /// callers).
    pub fn with_drain_pause(drain_pause: Duration) -> Arc<Self> {
        let queue = Arc::new(ExecutionQueue {
            queue: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
            idle: Notify::new(),
            draining: AtomicBool::new(false),
            high_priority_running: AtomicUsize::new(0),
            total_executed: AtomicUsize::new(0),
            total_failed: AtomicUsize::new(0),
            drain_pause,
            shutdown: CancellationToken::new(),
        });

        let worker = Arc::clone(&queue);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = worker.shutdown.cancelled() => {
                        debug!("Queue drain worker shutting down");
                        break;
                    }
                    _ = worker.wake.notified() => {}
                }
                worker.drain().await;
            }
        });

        queue
    }

    /// Runs a high-priority task immediately, within the caller's own
    /// concurrent context.
    ///
    /// No queueing, no bound on concurrent high-priority work. The
    /// running counter is restored however the task ends, and a failure
    /// is re-raised to the caller after it is counted.
    pub async fn run_high(&self, task: ExecutionTask) -> Result<()> {
        let ExecutionTask { id, name, work, .. } = task;

        let active = self.high_priority_running.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Executing high priority task: {name} ({id}), {active} active");
        let _guard = CounterGuard(&self.high_priority_running);

        match work().await {
            Ok(()) => {
                self.total_executed.fetch_add(1, Ordering::SeqCst);
                debug!("High priority task completed: {name}");
                Ok(())
            }
            Err(e) => {
                self.total_failed.fetch_add(1, Ordering::SeqCst);
                error!("High priority task failed: {name}: {e:#}");
                Err(e)
            }
        }
    }

    /// Appends a task to the low-priority FIFO and returns its id
    /// without waiting for execution.
    pub async fn enqueue_low(&self, task: ExecutionTask) -> String {
        let id = task.id.clone();
        let length = {
            let mut queue = self.queue.lock().await;
            queue.push_back(task);
            queue.len()
        };
        info!("Queued low priority task ({id}), queue length {length}");
        self.wake.notify_one();
        id
    }

    /// Drains the FIFO one task at a time.
    ///
    /// A failed task is logged and the lane keeps going; nothing is
    /// retried here. While more tasks remain, a fixed pause separates
    /// executions.
    async fn drain(&self) {
        loop {
            let task = {
                let mut queue = self.queue.lock().await;
                let task = queue.pop_front();
                if task.is_some() {
                    // Flag flip happens under the queue lock so an
                    // empty-and-idle observation is never split across
                    // a task being handed to the worker.
                    self.draining.store(true, Ordering::SeqCst);
                }
                task
            };
            let Some(task) = task else { break };

            let ExecutionTask {
                id,
                name,
                work,
                enqueued_at,
            } = task;
            info!(
                "Executing low priority task: {name} ({id}), waited {}s",
                enqueued_at.elapsed().as_secs()
            );

            match work().await {
                Ok(()) => {
                    self.total_executed.fetch_add(1, Ordering::SeqCst);
                    debug!("Low priority task completed: {name}");
                }
                Err(e) => {
                    self.total_failed.fetch_add(1, Ordering::SeqCst);
                    error!("Low priority task failed: {name}: {e:#}");
                }
            }

            let remaining = self.queue.lock().await.len();
            if remaining > 0 {
                debug!("{remaining} low priority tasks remain, pausing before next");
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.drain_pause) => {}
                }
            }
        }

        self.draining.store(false, Ordering::SeqCst);
        self.idle.notify_waiters();
        debug!("Low priority queue drained");
    }

    /// Snapshot of the live counters.
    pub async fn stats(&self) -> QueueStats {
        QueueStats {
            high_priority_running: self.high_priority_running.load(Ordering::SeqCst),
            low_priority_queue_length: self.queue.lock().await.len(),
            low_priority_draining: self.draining.load(Ordering::SeqCst),
            total_executed: self.total_executed.load(Ordering::SeqCst),
            total_failed: self.total_failed.load(Ordering::SeqCst),
        }
    }

    /// Lists the tasks still waiting in the low-priority lane.
    pub async fn queued_tasks(&self) -> Vec<QueuedTaskInfo> {
        let queue = self.queue.lock().await;
        queue
            .iter()
            .map(|task| QueuedTaskInfo {
                id: task.id.clone(),
                name: task.name.clone(),
                waited_ms: task.enqueued_at.elapsed().as_millis() as u64,
            })
            .collect()
    }

    /// Discards every task not yet started. A task currently executing
    /// is not cancelled. Returns how many tasks were dropped.
    pub async fn clear_queue(&self) -> usize {
        let mut queue = self.queue.lock().await;
        let cleared = queue.len();
        queue.clear();
        warn!("Cleared {cleared} waiting tasks from queue");
        cleared
    }

    /// Resolves once the low-priority lane is empty and idle.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register for the idle notification before checking, so a
            // drain finishing in between cannot slip past unobserved
            notified.as_mut().enable();

            let empty = self.queue.lock().await.is_empty();
            if empty && !self.draining.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    /// Stops the drain worker. Queued tasks stay in the list but nothing
    /// executes them afterwards; a task mid-execution finishes first.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_task(id: &str) -> ExecutionTask {
        ExecutionTask::new(id, format!("task {id}"), || async { Ok(()) })
    }

    #[tokio::test]
    async fn test_initial_stats() {
        let queue = ExecutionQueue::new();
        let stats = queue.stats().await;
        assert_eq!(stats.high_priority_running, 0);
        assert_eq!(stats.low_priority_queue_length, 0);
        assert!(!stats.low_priority_draining);
        assert_eq!(stats.total_executed, 0);
        assert_eq!(stats.total_failed, 0);
        queue.shutdown();
    }

    #[tokio::test]
    async fn test_enqueue_returns_id_immediately() {
        // Stopped worker: the task must not run for the id to come back
        let queue = ExecutionQueue::new();
        queue.shutdown();
        let id = queue.enqueue_low(noop_task("abc")).await;
        assert_eq!(id, "abc");
        assert_eq!(queue.stats().await.low_priority_queue_length, 1);
    }

    #[tokio::test]
    async fn test_queued_tasks_lists_waiting_work() {
        let queue = ExecutionQueue::new();
        queue.shutdown();
        queue.enqueue_low(noop_task("a")).await;
        queue.enqueue_low(noop_task("b")).await;
        let waiting = queue.queued_tasks().await;
        assert_eq!(waiting.len(), 2);
        assert_eq!(waiting[0].id, "a");
        assert_eq!(waiting[1].id, "b");
    }

    #[tokio::test]
    async fn test_clear_queue_reports_dropped_count() {
        let queue = ExecutionQueue::new();
        queue.shutdown();
        queue.enqueue_low(noop_task("a")).await;
        queue.enqueue_low(noop_task("b")).await;
        assert_eq!(queue.clear_queue().await, 2);
        assert_eq!(queue.stats().await.low_priority_queue_length, 0);
    }

    #[tokio::test]
    async fn test_high_priority_failure_propagates_and_counts() {
        let queue = ExecutionQueue::new();
        let task = ExecutionTask::new("x", "failing task", || async {
            Err(anyhow::anyhow!("boom"))
        });
        let result = queue.run_high(task).await;
        assert!(result.is_err());
        let stats = queue.stats().await;
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.total_executed, 0);
        assert_eq!(stats.high_priority_running, 0);
        queue.shutdown();
    }

    #[tokio::test]
    async fn test_high_priority_success_counts() {
        let queue = ExecutionQueue::new();
        queue.run_high(noop_task("y")).await.unwrap();
        let stats = queue.stats().await;
        assert_eq!(stats.total_executed, 1);
        assert_eq!(stats.high_priority_running, 0);
        queue.shutdown();
    }
}
