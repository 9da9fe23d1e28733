#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use adb_runner::exec::{AdbArgs, AdbExecutor, ExecutorSettings};
use common::{fake_adb_script, init_tracing, quick_options, with_timeout};
use tempfile::TempDir;

fn executor_for(dir: &TempDir, body: &str) -> AdbExecutor {
    let script = fake_adb_script(dir.path(), body);
    AdbExecutor::new(ExecutorSettings::new(script))
}

#[tokio::test]
async fn succeeds_on_third_attempt_with_that_attempts_output() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("count");
    let body = format!(
        r#"n=$(cat "{c}" 2>/dev/null || echo 0)
n=$((n+1))
echo $n > "{c}"
if [ "$n" -lt 3 ]; then echo "attempt $n failed" >&2; exit 1; fi
echo "attempt $n ok"
echo "args: $*""#,
        c = counter.display()
    );
    let executor = executor_for(&dir, &body);

    let result = with_timeout(executor.execute_foreground(
        AdbArgs::from(["shell", "getprop"]),
        Some("emu-1"),
        quick_options(5),
    ))
    .await;

    assert!(result.success);
    assert_eq!(
        result.output,
        vec!["attempt 3 ok", "args: -s emu-1 shell getprop"]
    );
    assert_eq!(std::fs::read_to_string(&counter).unwrap().trim(), "3");
}

#[tokio::test]
async fn gives_up_after_the_configured_attempts() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("count");
    let body = format!(
        r#"n=$(cat "{c}" 2>/dev/null || echo 0)
echo $((n+1)) > "{c}"
echo "no device" >&2
exit 1"#,
        c = counter.display()
    );
    let executor = executor_for(&dir, &body);

    let result =
        with_timeout(executor.execute_foreground(AdbArgs::from(["devices"]), None, quick_options(2)))
            .await;

    assert!(!result.success);
    assert_eq!(result.output, vec!["no device"]);
    assert_eq!(std::fs::read_to_string(&counter).unwrap().trim(), "2");
}

#[tokio::test]
async fn timed_out_attempt_is_killed_and_fails() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let executor = executor_for(&dir, "echo started\nexec sleep 30");

    let options = quick_options(1).with_timeout(Duration::from_millis(300));
    let started = Instant::now();
    let result =
        with_timeout(executor.execute_foreground(AdbArgs::from(["logcat"]), None, options)).await;

    assert!(!result.success);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(result.output, vec!["started"]);
}

#[tokio::test]
async fn remote_server_flags_reach_the_process() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let script = fake_adb_script(dir.path(), r#"echo "$*""#);
    let executor = AdbExecutor::new(
        ExecutorSettings::new(script)
            .with_remote(adb_runner::exec::RemoteServer::new("10.1.2.3", 5038)),
    );

    let result = with_timeout(executor.execute_foreground(
        AdbArgs::from(["reboot"]),
        Some("abc"),
        quick_options(1),
    ))
    .await;

    assert!(result.success);
    assert_eq!(result.output, vec!["-H 10.1.2.3 -P 5038 -s abc reboot"]);
}

#[tokio::test]
async fn background_commands_leave_the_registry_when_they_stop() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    // `short` exits by itself, anything else runs until killed.
    let executor = executor_for(
        &dir,
        r#"if [ "$1" = "short" ]; then echo done; exit 0; fi
echo running
exec sleep 30"#,
    );

    let mut long_lived = Vec::new();
    for _ in 0..3 {
        long_lived.push(executor.execute_background(AdbArgs::from(["long"]), None).unwrap());
    }
    let short: Vec<_> = (0..2)
        .map(|_| executor.execute_background(AdbArgs::from(["short"]), None).unwrap())
        .collect();
    assert_eq!(executor.registry().len(), 5);

    for handle in &short {
        with_timeout(handle.wait()).await;
    }
    // Removal happens before the exit is published.
    assert_eq!(executor.registry().len(), 3);

    let stopped = with_timeout(executor.terminate(&long_lived[0])).await;
    assert!(stopped.success);
    assert_eq!(executor.registry().len(), 2);

    with_timeout(executor.close()).await;
    assert!(executor.registry().is_empty());
    for handle in &long_lived {
        assert!(handle.is_finished());
    }
}

#[tokio::test]
async fn terminating_twice_returns_the_same_result() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let executor = executor_for(&dir, "echo capture started\nexec sleep 30");

    let handle = executor.execute_background(AdbArgs::from(["logcat"]), None).unwrap();
    // Give the reader a moment to see the first line.
    with_timeout(async {
        while handle.output().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    let first = with_timeout(handle.terminate()).await;
    let second = with_timeout(handle.terminate()).await;

    assert!(first.success);
    assert_eq!(first, second);
    assert_eq!(first.output, vec!["capture started"]);
    assert!(handle.is_finished());
}

#[tokio::test]
async fn cancellation_stops_a_running_command() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let executor = executor_for(&dir, "exec sleep 30");
    let token = executor.cancel_token().clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = Instant::now();
    let result = with_timeout(executor.execute_foreground(
        AdbArgs::from(["wait-for-device"]),
        None,
        quick_options(3),
    ))
    .await;

    assert!(!result.success);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn clean_exit_is_not_a_timeout_while_a_grandchild_holds_the_pipes() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    // The backgrounded sleep keeps stdout open after the script itself exits.
    let executor = executor_for(&dir, "sleep 3 &\necho ok\nexit 0");

    let options = quick_options(1).with_timeout(Duration::from_millis(300));
    let result =
        with_timeout(executor.execute_foreground(AdbArgs::from(["shell"]), None, options)).await;

    assert!(result.success);
    assert_eq!(result.output, vec!["ok"]);
}

#[tokio::test]
async fn sleeps_once_between_each_pair_of_attempts() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("count");
    let body = format!(
        r#"n=$(cat "{c}" 2>/dev/null || echo 0)
n=$((n+1))
echo $n > "{c}"
if [ "$n" -lt 3 ]; then exit 1; fi
echo "attempt $n ok""#,
        c = counter.display()
    );
    let executor = executor_for(&dir, &body);

    let wait = Duration::from_millis(600);
    let options = quick_options(5).with_retry_wait(wait);
    let started = Instant::now();
    let result =
        with_timeout(executor.execute_foreground(AdbArgs::from(["devices"]), None, options)).await;
    let elapsed = started.elapsed();

    assert!(result.success);
    assert_eq!(std::fs::read_to_string(&counter).unwrap().trim(), "3");
    // Two sleeps for three attempts; a third sleep would push this past 3 * wait.
    assert!(elapsed >= wait * 2, "elapsed {elapsed:?}");
    assert!(elapsed < wait * 3, "elapsed {elapsed:?}");
}

#[tokio::test]
async fn cancelled_executor_launches_nothing() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("launched");
    let executor = executor_for(&dir, &format!(r#"touch "{}""#, marker.display()));
    executor.cancel_token().cancel();

    let result = with_timeout(executor.execute_foreground(
        AdbArgs::from(["devices"]),
        None,
        quick_options(3),
    ))
    .await;

    assert!(!result.success);
    assert!(result.output.is_empty());
    assert!(!marker.exists());
}
