//! Integration tests for `trend feed`.
//! Verifies that stdin EOF and signals drain the queue, flush, and exit cleanly.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const T0: u64 = 1_771_632_000_000;

fn trend_binary() -> std::path::PathBuf {
    assert_cmd::cargo::cargo_bin!("trend").into()
}

fn spawn_feed(data_dir: &TempDir) -> std::process::Child {
    Command::new(trend_binary())
        .arg("feed")
        .env("TREND_DATA_DIR", data_dir.path())
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn trend feed")
}

/// Wait for the pidfile to appear, indicating signal handlers are installed.
fn wait_for_pidfile(data_dir: &TempDir) {
    let pidfile = data_dir.path().join("trend-feed.pid");
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if pidfile.exists() {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    panic!("trend feed never wrote its pidfile");
}

fn top(data_dir: &TempDir) -> String {
    let output = Command::new(trend_binary())
        .arg("top")
        .env("TREND_DATA_DIR", data_dir.path())
        .output()
        .expect("failed to run trend top");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn feed_exits_on_immediate_eof() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_feed(&dir);
    drop(child.stdin.take());

    let start = Instant::now();
    let output = child.wait_with_output().expect("wait");
    let elapsed = start.elapsed();

    assert!(
        output.status.success(),
        "trend feed should exit 0 on stdin EOF, got {}",
        output.status
    );
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("recorded=0"), "stdout: {stdout}");
}

#[test]
fn feed_records_lines_and_persists() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_feed(&dir);

    {
        let stdin = child.stdin.as_mut().expect("stdin pipe");
        writeln!(stdin, "# warm-up batch").unwrap();
        writeln!(stdin, "alpha {T0}").unwrap();
        writeln!(stdin, "beta {T0}").unwrap();
        writeln!(stdin, "alpha {}", T0 + 20_000).unwrap();
        writeln!(stdin, "gamma not-a-time").unwrap();
        stdin.flush().unwrap();
    }
    drop(child.stdin.take());

    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success(), "exit: {}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("recorded=3"), "stdout: {stdout}");
    assert!(stdout.contains("skipped=1"), "stdout: {stdout}");

    assert_eq!(top(&dir), "alpha\nbeta\n");
}

#[test]
fn wal_checkpoint_on_exit() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_feed(&dir);

    {
        let stdin = child.stdin.as_mut().expect("stdin pipe");
        for i in 0..20 {
            writeln!(stdin, "item-{} {}", i % 4, T0 + i * 1_000).unwrap();
        }
        stdin.flush().unwrap();
    }
    drop(child.stdin.take());
    child.wait().expect("wait");

    // TRUNCATE checkpoint leaves the WAL empty or removes it
    let wal = dir.path().join("trend.db-wal");
    if wal.exists() {
        let len = std::fs::metadata(&wal).unwrap().len();
        assert_eq!(len, 0, "WAL should be truncated after clean exit");
    }
}

/// SIGINT with stdin still open must flush and exit, not hang on the read.
#[cfg(unix)]
#[test]
fn feed_exits_on_sigint_with_stdin_open() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_feed(&dir);
    {
        let stdin = child.stdin.as_mut().expect("stdin pipe");
        writeln!(stdin, "alpha {T0}").unwrap();
        stdin.flush().unwrap();
    }
    wait_for_pidfile(&dir);
    std::thread::sleep(Duration::from_millis(300));

    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGINT);
    }

    let start = Instant::now();
    let deadline = start + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("trend feed still running 5s after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    assert!(status.success(), "SIGINT should exit 0, got {status}");
    assert!(
        !dir.path().join("trend-feed.pid").exists(),
        "pidfile should be removed after clean shutdown"
    );
    assert_eq!(top(&dir), "alpha\n");
    drop(child.stdin.take());
}

#[test]
fn record_refused_while_feed_running() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_feed(&dir);
    wait_for_pidfile(&dir);

    let output = Command::new(trend_binary())
        .args(["record", "late"])
        .env("TREND_DATA_DIR", dir.path())
        .output()
        .expect("failed to run trend record");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("is running"), "stderr: {stderr}");

    drop(child.stdin.take());
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    assert_eq!(top(&dir), "(no trending items)\n");
}
