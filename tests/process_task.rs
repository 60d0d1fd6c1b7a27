//! End-to-end tests of `ProcessTask` against real child processes.
//!
//! Unix only: the commands are POSIX shell utilities.

#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sketch_tasks::{ProcessTask, TaskState};

fn run_collect(task: &mut ProcessTask) -> (sketch_tasks::TaskOutcome, Vec<String>) {
    let mut lines = Vec::new();
    let outcome = task
        .run(&mut |line: &str| lines.push(line.to_string()))
        .unwrap();
    (outcome, lines)
}

fn sh(id: &str, script: &str, buffer_size: usize) -> ProcessTask {
    ProcessTask::new(id, "sh", ["-c", script], buffer_size)
}

// ─── Output Decoding ────────────────────────────────────────────────────────

mod output {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn echo_hello() {
        let mut task = ProcessTask::new("echo", "echo", ["hello"], 1024);
        let (outcome, lines) = run_collect(&mut task);

        assert_eq!(lines, vec!["hello"]);
        assert_eq!(outcome.state, TaskState::Completed);
        assert_eq!(task.exit_code(), Some(0));
    }

    #[test]
    fn stderr_is_merged_in_order() {
        let mut task = sh("merged", "echo out; echo err 1>&2; echo out2", 64);
        let (_, lines) = run_collect(&mut task);
        assert_eq!(lines, vec!["out", "err", "out2"]);
    }

    #[test]
    fn blank_lines_reach_the_handler() {
        let mut task = ProcessTask::new("blank", "printf", ["first\\n\\n\\nlast\\n"], 8);
        let (outcome, lines) = run_collect(&mut task);
        assert_eq!(lines, vec!["first", "", "", "last"]);
        assert_eq!(outcome.lines, 4);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let mut task = ProcessTask::new("crlf", "printf", ["a\\r\\nb\\r\\n"], 3);
        let (_, lines) = run_collect(&mut task);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn unterminated_tail_is_delivered() {
        let mut task = ProcessTask::new("tail", "printf", ["one\\ntwo"], 2);
        let (_, lines) = run_collect(&mut task);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn line_longer_than_buffer_is_kept_whole() {
        let mut task = sh("long", "printf '%0300d\\n' 0; echo after", 4);
        let (_, lines) = run_collect(&mut task);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0".repeat(300));
        assert_eq!(lines[1], "after");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut task = ProcessTask::new("bytes", "printf", ["ok\\377\\n"], 16);
        let (_, lines) = run_collect(&mut task);
        assert_eq!(lines, vec!["ok\u{FFFD}"]);
    }
}

// ─── Exit Codes ─────────────────────────────────────────────────────────────

mod exit_codes {
    use super::*;

    #[test]
    fn nonzero_exit_still_completes() {
        let mut task = sh("exit7", "echo failing; exit 7", 64);
        let (outcome, lines) = run_collect(&mut task);

        assert_eq!(lines, vec!["failing"]);
        assert_eq!(outcome.state, TaskState::Completed);
        assert_eq!(outcome.exit_code, Some(7));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn missing_binary_fails_without_lines() {
        let mut task = ProcessTask::new("missing", "no-such-build-tool-9f3a", ["Release"], 64);
        let (outcome, lines) = run_collect(&mut task);

        assert!(lines.is_empty());
        assert_eq!(outcome.state, TaskState::Failed);
        assert_eq!(outcome.exit_code, None);
        let err = outcome.error.unwrap();
        assert_eq!(err.kind(), "spawn");
        assert!(err.to_string().contains("no-such-build-tool-9f3a"));
    }
}

// ─── Environment ────────────────────────────────────────────────────────────

mod environment {
    use super::*;

    #[test]
    fn working_directory_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = ProcessTask::new("pwd", "pwd", Vec::<String>::new(), 64)
            .with_working_dir(dir.path());
        let (_, lines) = run_collect(&mut task);

        assert_eq!(lines.len(), 1);
        assert_eq!(
            std::fs::canonicalize(&lines[0]).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[test]
    fn extra_variables_are_visible() {
        let mut task = sh("env", "echo \"$SKETCH_TEST_VALUE\"", 64)
            .with_env([("SKETCH_TEST_VALUE", "from-task")]);
        let (_, lines) = run_collect(&mut task);
        assert_eq!(lines, vec!["from-task"]);
    }
}

// ─── Cancellation ───────────────────────────────────────────────────────────

mod cancellation {
    use super::*;

    #[test]
    fn cancel_mid_stream_stops_the_child() {
        let mut task = sh("mid", "echo start; exec sleep 5", 64);
        let token = task.cancellation_token();
        let started = Instant::now();

        let mut lines = Vec::new();
        let outcome = task
            .run(&mut |line: &str| {
                lines.push(line.to_string());
                token.cancel();
            })
            .unwrap();

        assert_eq!(lines, vec!["start"]);
        assert_eq!(outcome.state, TaskState::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(4));
        // SIGKILL
        assert_eq!(outcome.exit_code, Some(137));
    }

    #[test]
    fn background_job_keeps_stream_open_after_cancel() {
        let mut task = sh("jobs", "sleep 1 & echo start; exec sleep 5", 64);
        let token = task.cancellation_token();
        let started = Instant::now();

        let mut lines = Vec::new();
        let outcome = task
            .run(&mut |line: &str| {
                lines.push(line.to_string());
                token.cancel();
            })
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(lines, vec!["start"]);
        assert_eq!(outcome.state, TaskState::Cancelled);
        // The killed shell's background job still holds the write end.
        assert!(elapsed >= Duration::from_millis(800), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "{elapsed:?}");
    }

    #[test]
    fn cancel_while_child_is_silent() {
        let mut task = sh("silent", "exec sleep 1", 64);
        let token = task.cancellation_token();

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            token.cancel();
        });

        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let outcome = task
            .run(&mut |line: &str| sink.lock().unwrap().push(line.to_string()))
            .unwrap();
        canceller.join().unwrap();

        assert_eq!(outcome.state, TaskState::Cancelled);
        assert!(lines.lock().unwrap().is_empty());
        assert_eq!(task.state(), TaskState::Cancelled);
    }

    #[test]
    fn repeated_cancellation_matches_single() {
        let mut once = sh("once", "echo a; exec sleep 5", 64);
        let mut many = sh("many", "echo a; exec sleep 5", 64);
        let once_token = once.cancellation_token();
        let many_token = many.cancellation_token();

        let (a, _) = {
            let mut lines = Vec::new();
            let outcome = once
                .run(&mut |l: &str| {
                    lines.push(l.to_string());
                    once_token.cancel();
                })
                .unwrap();
            (outcome, lines)
        };
        let (b, _) = {
            let mut lines = Vec::new();
            let outcome = many
                .run(&mut |l: &str| {
                    lines.push(l.to_string());
                    for _ in 0..5 {
                        many_token.cancel();
                    }
                })
                .unwrap();
            (outcome, lines)
        };

        assert_eq!(a.state, b.state);
        assert_eq!(a.exit_code, b.exit_code);
        assert_eq!(a.lines, b.lines);
    }
}
