//! Scheduling contracts of the dual-priority queue: FIFO order, the
//! inter-task pause, serial low-priority execution, and high-priority
//! work never waiting behind a drain.
//!
//! Timing-sensitive tests run under paused tokio time so the 2s pause
//! is observed exactly without slowing the suite down.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use site_patrol::{ExecutionQueue, ExecutionTask};

type EventLog = Arc<Mutex<Vec<(String, Instant)>>>;

fn logging_task(id: &str, events: EventLog, work_duration: Duration) -> ExecutionTask {
    let id_owned = id.to_string();
    ExecutionTask::new(id, format!("task {id}"), move || async move {
        events
            .lock()
            .await
            .push((format!("start:{id_owned}"), Instant::now()));
        tokio::time::sleep(work_duration).await;
        events
            .lock()
            .await
            .push((format!("end:{id_owned}"), Instant::now()));
        Ok(())
    })
}

async fn event_instant(events: &EventLog, label: &str) -> Instant {
    events
        .lock()
        .await
        .iter()
        .find(|(name, _)| name == label)
        .map(|(_, at)| *at)
        .unwrap_or_else(|| panic!("event {label} not recorded"))
}

#[tokio::test(start_paused = true)]
async fn test_low_priority_runs_fifo_with_pause_between_tasks() {
    let queue = ExecutionQueue::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    queue
        .enqueue_low(logging_task("A", Arc::clone(&events), Duration::from_millis(100)))
        .await;
    queue
        .enqueue_low(logging_task("B", Arc::clone(&events), Duration::from_millis(100)))
        .await;

    queue.wait_until_idle().await;

    let order: Vec<String> = events
        .lock()
        .await
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    assert_eq!(order, vec!["start:A", "end:A", "start:B", "end:B"]);

    // B must not start until the fixed pause after A's completion
    let end_a = event_instant(&events, "end:A").await;
    let start_b = event_instant(&events, "start:B").await;
    assert!(
        start_b.duration_since(end_a) >= Duration::from_secs(2),
        "pause between tasks was {:?}",
        start_b.duration_since(end_a)
    );

    let stats = queue.stats().await;
    assert_eq!(stats.total_executed, 2);
    assert!(!stats.low_priority_draining);
    queue.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_no_pause_after_the_last_task() {
    let queue = ExecutionQueue::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    let before = Instant::now();
    queue
        .enqueue_low(logging_task("only", Arc::clone(&events), Duration::from_millis(50)))
        .await;
    queue.wait_until_idle().await;

    // Idle arrives right after the task; no trailing 2s pause
    assert!(before.elapsed() < Duration::from_secs(1));
    queue.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_high_priority_completes_while_drain_is_busy() {
    let queue = ExecutionQueue::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    for i in 0..5 {
        queue
            .enqueue_low(logging_task(
                &format!("low-{i}"),
                Arc::clone(&events),
                Duration::from_millis(100),
            ))
            .await;
    }

    // With the pauses, the drain needs several seconds; the high task
    // finishes in milliseconds
    let done = Arc::new(AtomicUsize::new(0));
    let done_for_task = Arc::clone(&done);
    let task = ExecutionTask::new("X", "interactive check", move || async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        done_for_task.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    queue.run_high(task).await.unwrap();

    assert_eq!(done.load(Ordering::SeqCst), 1);
    let stats = queue.stats().await;
    assert!(
        stats.low_priority_queue_length > 0 || stats.low_priority_draining,
        "low lane should still be busy when the high task finishes"
    );

    queue.wait_until_idle().await;
    assert_eq!(queue.stats().await.total_executed, 6);
    queue.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_failed_low_task_does_not_halt_the_lane() {
    let queue = ExecutionQueue::new();
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));

    queue
        .enqueue_low(logging_task("A", Arc::clone(&events), Duration::from_millis(10)))
        .await;
    queue
        .enqueue_low(ExecutionTask::new("B", "broken task", || async {
            Err(anyhow::anyhow!("task exploded"))
        }))
        .await;
    queue
        .enqueue_low(logging_task("C", Arc::clone(&events), Duration::from_millis(10)))
        .await;

    queue.wait_until_idle().await;

    let names: Vec<String> = events
        .lock()
        .await
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    assert!(names.contains(&"end:A".to_string()));
    assert!(names.contains(&"end:C".to_string()));

    let stats = queue.stats().await;
    assert_eq!(stats.total_executed, 2);
    assert_eq!(stats.total_failed, 1);
    queue.shutdown();
}

#[tokio::test]
async fn test_low_priority_never_runs_two_tasks_at_once() {
    let queue = ExecutionQueue::with_drain_pause(Duration::from_millis(5));
    let running = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    for i in 0..5 {
        let running = Arc::clone(&running);
        let max_seen = Arc::clone(&max_seen);
        let task = ExecutionTask::new(format!("{i}"), format!("serial {i}"), move || async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });
        queue.enqueue_low(task).await;
    }

    queue.wait_until_idle().await;
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    queue.shutdown();
}

#[tokio::test]
async fn test_clear_queue_drops_waiting_but_not_running() {
    let queue = ExecutionQueue::with_drain_pause(Duration::from_millis(5));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let executed = Arc::new(Mutex::new(Vec::<String>::new()));

    let executed_a = Arc::clone(&executed);
    queue
        .enqueue_low(ExecutionTask::new("A", "gated task", move || async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            executed_a.lock().await.push("A".to_string());
            Ok(())
        }))
        .await;
    for id in ["B", "C"] {
        let executed = Arc::clone(&executed);
        queue
            .enqueue_low(ExecutionTask::new(id, format!("waiting {id}"), move || {
                let id = id.to_string();
                async move {
                    executed.lock().await.push(id);
                    Ok(())
                }
            }))
            .await;
    }

    // A is mid-execution; B and C are still waiting
    started_rx.await.expect("first task never started");
    assert_eq!(queue.clear_queue().await, 2);
    assert!(queue.queued_tasks().await.is_empty());

    let _ = release_tx.send(());
    queue.wait_until_idle().await;

    assert_eq!(*executed.lock().await, vec!["A".to_string()]);
    let stats = queue.stats().await;
    assert_eq!(stats.total_executed, 1);
    queue.shutdown();
}

#[tokio::test]
async fn test_enqueue_while_draining_joins_the_same_drain() {
    let queue = ExecutionQueue::with_drain_pause(Duration::from_millis(5));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let executed = Arc::new(Mutex::new(Vec::<String>::new()));

    let executed_a = Arc::clone(&executed);
    queue
        .enqueue_low(ExecutionTask::new("A", "gated task", move || async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            executed_a.lock().await.push("A".to_string());
            Ok(())
        }))
        .await;

    started_rx.await.expect("first task never started");
    assert!(queue.stats().await.low_priority_draining);

    // Growing the FIFO mid-drain must not spin up a second worker pass
    let executed_d = Arc::clone(&executed);
    queue
        .enqueue_low(ExecutionTask::new("D", "late arrival", move || async move {
            executed_d.lock().await.push("D".to_string());
            Ok(())
        }))
        .await;

    let _ = release_tx.send(());
    queue.wait_until_idle().await;

    assert_eq!(*executed.lock().await, vec!["A".to_string(), "D".to_string()]);
    queue.shutdown();
}
