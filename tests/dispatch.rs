//! End-to-end dispatch runs against real child processes.
//!
//! A scratch shell script stands in for the ssh transport; its argv is
//! `<script> <host> <command...>`, matching the real invocation shape.

#![cfg(unix)]

use scatter::config::{Config, OutputMode, TransportOptions};
use scatter::dispatcher;
use scatter::sink::{JoinSink, LineSink};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

fn write_transport(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("transport.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.display().to_string()
}

fn config_for(program: &str, max_concurrency: i64) -> Config {
    Config {
        max_concurrency,
        transport: TransportOptions {
            program: Some(program.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn command(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn aggregate_status_is_the_literal_sum() {
    let dir = TempDir::new().unwrap();
    // The host doubles as the exit code.
    let transport = write_transport(&dir, r#"exit "$1""#);
    let config = config_for(&transport, 4);

    let mut sink = LineSink::new(Vec::new(), Vec::new(), false, false);
    let summary = dispatcher::run(&config, hosts(&["0", "1", "2"]), command(&["x"]), &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.status_sum, 3);
}

#[tokio::test]
async fn empty_host_list_drains_immediately() {
    let config = config_for("/bin/true", 4);
    let mut sink = LineSink::new(Vec::new(), Vec::new(), false, false);
    let summary = dispatcher::run(&config, Vec::new(), command(&["x"]), &mut sink)
        .await
        .unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.status_sum, 0);
}

#[tokio::test]
async fn dry_run_spawns_nothing() {
    // A transport that cannot exist: if anything were spawned, each job
    // would report 127 and the sum could not stay zero.
    let config = Config {
        dry_run: true,
        ..config_for("/nonexistent/transport-exe", 1)
    };
    let mut sink = LineSink::new(Vec::new(), Vec::new(), false, false);
    let summary = dispatcher::run(&config, hosts(&["h1", "h2"]), command(&["x"]), &mut sink)
        .await
        .unwrap();
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.status_sum, 0);
}

#[tokio::test]
async fn spawn_failure_never_aborts_the_batch() {
    let config = config_for("/nonexistent/transport-exe", 2);
    let mut sink = LineSink::new(Vec::new(), Vec::new(), false, false);
    let summary = dispatcher::run(&config, hosts(&["h1", "h2"]), command(&["x"]), &mut sink)
        .await
        .unwrap();
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.status_sum, 254);
}

#[tokio::test]
async fn invalid_concurrency_rejected_before_dispatch() {
    let config = config_for("/bin/true", 0);
    let mut sink = LineSink::new(Vec::new(), Vec::new(), false, false);
    let result = dispatcher::run(&config, hosts(&["h1"]), command(&["x"]), &mut sink).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn line_mode_prefixes_every_host_line() {
    let dir = TempDir::new().unwrap();
    let transport = write_transport(&dir, r#"echo "hello from $1""#);
    let config = config_for(&transport, 4);

    let mut sink = LineSink::new(Vec::new(), Vec::new(), false, false);
    dispatcher::run(&config, hosts(&["a", "b"]), command(&["x"]), &mut sink)
        .await
        .unwrap();

    let (out, _) = sink.into_writers();
    let rendered = String::from_utf8(out).unwrap();
    assert!(rendered.contains("[a] hello from a\n"));
    assert!(rendered.contains("[b] hello from b\n"));
}

#[tokio::test]
async fn join_mode_groups_identical_output() {
    let dir = TempDir::new().unwrap();
    let transport = write_transport(&dir, "echo same");
    let config = Config {
        output_mode: OutputMode::Join,
        ..config_for(&transport, 4)
    };

    let mut sink = JoinSink::new(Vec::new(), Vec::new(), 3, false);
    dispatcher::run(&config, hosts(&["a", "b", "c"]), command(&["x"]), &mut sink)
        .await
        .unwrap();

    let (out, err) = sink.into_writers();
    let rendered = String::from_utf8(out).unwrap();
    assert_eq!(rendered, "[a,b,c]\nsame\n");
    let progress = String::from_utf8(err).unwrap();
    assert_eq!(progress.matches("finished").count(), 3);
    assert!(progress.ends_with("finished 3/3\n"));
}

#[tokio::test]
async fn cap_of_one_serializes_jobs() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("events.log");
    let body = format!(
        "echo start >> {log}\nsleep 0.1\necho end >> {log}",
        log = log.display()
    );
    let transport = write_transport(&dir, &body);
    let config = config_for(&transport, 1);

    let mut sink = LineSink::new(Vec::new(), Vec::new(), false, false);
    dispatcher::run(&config, hosts(&["a", "b", "c"]), command(&["x"]), &mut sink)
        .await
        .unwrap();

    let events: Vec<String> = read_events(&log);
    assert_eq!(events.len(), 6);
    for pair in events.chunks(2) {
        assert_eq!(pair, ["start", "end"]);
    }
}

#[tokio::test]
async fn running_jobs_never_exceed_the_cap() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("events.log");
    let body = format!(
        "echo start >> {log}\nsleep 0.2\necho end >> {log}",
        log = log.display()
    );
    let transport = write_transport(&dir, &body);
    let config = config_for(&transport, 2);

    let mut sink = LineSink::new(Vec::new(), Vec::new(), false, false);
    dispatcher::run(&config, hosts(&["a", "b", "c", "d", "e"]), command(&["x"]), &mut sink)
        .await
        .unwrap();

    let mut depth = 0i32;
    let mut max_depth = 0i32;
    for event in read_events(&log) {
        match event.as_str() {
            "start" => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            "end" => depth -= 1,
            other => panic!("unexpected log entry: {other}"),
        }
    }
    assert_eq!(depth, 0);
    assert!(max_depth <= 2, "observed {max_depth} concurrent jobs");
}

fn read_events(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
