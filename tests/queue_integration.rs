//! TaskQueue integration tests with real child processes.

#![cfg(unix)]

use std::time::Duration;

use sketch_tasks::{
    NotificationReceiver, ProcessTask, TaskNotification, TaskQueue, TaskState, TerminalEvent,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

async fn next(rx: &mut NotificationReceiver) -> TaskNotification {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("channel closed")
}

/// Collects line texts until the terminal event of `task_id`.
async fn collect_until_terminal(
    rx: &mut NotificationReceiver,
    task_id: &str,
) -> (Vec<String>, TerminalEvent) {
    let mut lines = Vec::new();
    loop {
        match next(rx).await {
            TaskNotification::Line(line) if line.task_id == task_id => lines.push(line.text),
            TaskNotification::Terminal(event) if event.task_id == task_id => {
                return (lines, event)
            },
            _ => {},
        }
    }
}

// ─── Lifecycle ──────────────────────────────────────────────────────────────

mod lifecycle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn echo_posts_line_then_one_terminal() {
        let queue = TaskQueue::new();
        let mut rx = queue.subscribe();

        let handle = queue
            .enqueue(ProcessTask::new("echo", "echo", ["hello"], 1024))
            .unwrap();
        let (lines, event) = collect_until_terminal(&mut rx, "echo").await;

        assert_eq!(lines, vec!["hello"]);
        assert_eq!(event.state, TaskState::Completed);
        assert_eq!(event.exit_code, Some(0));
        assert_eq!(handle.await.unwrap(), event);

        // Nothing follows the terminal event.
        assert!(rx.try_recv().is_err());
        assert!(!queue.is_active("echo"));
    }

    #[tokio::test]
    async fn every_subscriber_sees_everything() {
        let queue = TaskQueue::new();
        let mut first = queue.subscribe();
        let mut second = queue.subscribe();

        queue
            .enqueue(ProcessTask::new("two", "printf", ["a\\nb\\n"], 4))
            .unwrap();

        let (a, _) = collect_until_terminal(&mut first, "two").await;
        let (b, _) = collect_until_terminal(&mut second, "two").await;
        assert_eq!(a, vec!["a", "b"]);
        assert_eq!(a, b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_tasks_each_finish_once() {
        let queue = TaskQueue::new();
        let mut rx = queue.subscribe();

        let ids = ["t0", "t1", "t2", "t3"];
        for id in ids {
            queue
                .enqueue(ProcessTask::new(id, "echo", [id], 64))
                .unwrap();
        }

        let mut terminals = Vec::new();
        while terminals.len() < ids.len() {
            if let TaskNotification::Terminal(event) = next(&mut rx).await {
                terminals.push(event.task_id);
            }
        }
        terminals.sort();
        assert_eq!(terminals, ids);
        assert!(queue.active_tasks().is_empty());
    }

    #[tokio::test]
    async fn spawn_failure_becomes_failed_event() {
        let queue = TaskQueue::new();
        let mut rx = queue.subscribe();

        queue
            .enqueue(ProcessTask::new("bad", "no-such-binary-for-queue", ["x"], 64))
            .unwrap();
        let (lines, event) = collect_until_terminal(&mut rx, "bad").await;

        assert!(lines.is_empty());
        assert_eq!(event.state, TaskState::Failed);
        assert_eq!(event.error.map(|e| e.kind), Some("spawn".to_string()));
    }
}

// ─── Cancellation ───────────────────────────────────────────────────────────

mod cancellation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn cancel_mid_stream() {
        let queue = TaskQueue::new();
        let mut rx = queue.subscribe();

        let handle = queue
            .enqueue(ProcessTask::new("long", "sh", ["-c", "echo start; exec sleep 2"], 64))
            .unwrap();

        match next(&mut rx).await {
            TaskNotification::Line(line) => assert_eq!(line.text, "start"),
            other => panic!("expected a line, got {other:?}"),
        }
        queue.cancel("long").unwrap();

        let (lines, event) = collect_until_terminal(&mut rx, "long").await;
        assert!(lines.is_empty(), "no lines after cancellation: {lines:?}");
        assert_eq!(event.state, TaskState::Cancelled);
        assert_eq!(handle.await.unwrap().state, TaskState::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn silent_child_reports_cancelled() {
        let queue = TaskQueue::new();
        let mut rx = queue.subscribe();

        queue
            .enqueue(ProcessTask::new("quiet", "sh", ["-c", "exec sleep 1"], 64))
            .unwrap();
        queue.cancel("quiet").unwrap();
        queue.cancel("quiet").unwrap();

        let (lines, event) = collect_until_terminal(&mut rx, "quiet").await;
        assert!(lines.is_empty());
        assert_eq!(event.state, TaskState::Cancelled);
    }

    #[tokio::test]
    async fn duplicate_and_unknown_ids() {
        let queue = TaskQueue::new();

        let handle = queue
            .enqueue(ProcessTask::new("same", "sh", ["-c", "exec sleep 1"], 64))
            .unwrap();
        let err = queue
            .enqueue(ProcessTask::new("same", "echo", ["x"], 64))
            .unwrap_err();
        assert_eq!(err.kind(), "duplicate_task");

        assert_eq!(queue.cancel("other").unwrap_err().kind(), "not_found");

        assert_eq!(queue.cancel_all(), 1);
        let event = tokio::time::timeout(RECV_TIMEOUT, handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.state, TaskState::Cancelled);
    }

    #[tokio::test]
    async fn finished_task_cannot_be_requeued() {
        let queue = TaskQueue::new();
        let mut task = ProcessTask::new("again", "echo", ["x"], 64);
        task.run(&mut |_: &str| {}).unwrap();

        let err = queue.enqueue(task).unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
    }
}
