mod common;

use std::path::PathBuf;
use std::time::Duration;

use adb_runner::commands::LogcatPriority;
use adb_runner::exec::AdbBackend;
use adb_runner::steps::{
    AdbCommand, AdbCommandStep, ClearLogcatStep, CommandSettings, FilterPair,
    LogcatExecutionMode, LogcatOutputMode, LogcatStep, RetrieveBackgroundLogcatStep, Verdict,
    run_step,
};
use adb_runner::types::CommandResult;
use common::{FakeAdb, init_tracing, with_timeout};
use tempfile::TempDir;

fn setup() -> (TempDir, TempDir, FakeAdb) {
    init_tracing();
    let device = TempDir::new().unwrap();
    let host = TempDir::new().unwrap();
    let adb = FakeAdb::new(device.path());
    (device, host, adb)
}

#[tokio::test]
async fn push_step_uses_its_own_retry_settings() {
    let (_device, host, adb) = setup();
    let local = host.path().join("data.bin");
    std::fs::write(&local, b"payload").unwrap();

    let mut step = AdbCommandStep {
        local_file: Some(local.clone()),
        remote_file: "/sdcard/data.bin".to_string(),
        device_id: Some("emu".to_string()),
        settings: CommandSettings {
            retries: 1,
            retry_wait_ms: 50,
            timeout_ms: 2_000,
        },
        ..AdbCommandStep::new(AdbCommand::Push)
    };

    let verdict = with_timeout(run_step(&mut step, &adb)).await.unwrap();

    assert_eq!(verdict, Verdict::Pass);
    assert!(adb.device_file_exists("/sdcard/data.bin"));
    let calls = adb.calls();
    let call = &calls[0];
    assert_eq!(call.device_id.as_deref(), Some("emu"));
    let options = call.options.unwrap();
    assert_eq!(options.retries, 1);
    assert_eq!(options.timeout, Duration::from_secs(2));
}

#[tokio::test]
async fn failing_command_fails_the_step() {
    let (_device, _host, adb) = setup();
    adb.respond(
        &["shell", "getprop"],
        CommandResult::failure(vec!["error: no devices/emulators found".to_string()]),
    );

    let mut step = AdbCommandStep {
        arguments: "shell getprop".to_string(),
        ..AdbCommandStep::default()
    };
    let verdict = with_timeout(run_step(&mut step, &adb)).await.unwrap();
    assert_eq!(verdict, Verdict::Fail);
}

#[tokio::test]
async fn invalid_step_never_reaches_the_device() {
    let (_device, _host, adb) = setup();
    let mut step = AdbCommandStep::new(AdbCommand::Uninstall);

    let err = with_timeout(run_step(&mut step, &adb)).await.unwrap_err();
    assert!(err.to_string().contains("package"));
    assert!(adb.calls().is_empty());
}

#[tokio::test]
async fn airplane_mode_stops_after_a_failed_setting() {
    let (_device, _host, adb) = setup();
    adb.respond(
        &["shell", "settings", "put", "global", "airplane_mode_on", "1"],
        CommandResult::failure(vec!["permission denied".to_string()]),
    );

    let result = with_timeout(adb.set_airplane_mode(true, None)).await;

    assert!(!result.success);
    assert_eq!(result.output, vec!["permission denied"]);
    assert_eq!(adb.calls().len(), 1);
}

#[tokio::test]
async fn airplane_mode_combines_both_outputs() {
    let (_device, _host, adb) = setup();
    adb.respond(
        &[
            "shell",
            "am",
            "broadcast",
            "-a",
            "android.intent.action.AIRPLANE_MODE",
            "--ez",
            "state",
            "false",
        ],
        CommandResult::success(vec!["Broadcast completed: result=0".to_string()]),
    );

    let result = with_timeout(adb.set_airplane_mode(false, None)).await;

    assert!(result.success);
    assert_eq!(result.output, vec!["", "Broadcast completed: result=0"]);
    assert_eq!(adb.calls().len(), 2);
}

#[tokio::test]
async fn instant_logcat_writes_the_local_file() {
    let (_device, host, adb) = setup();
    adb.respond(
        &["logcat", "-d", "-b", "main", "-v", "threadtime", "Wifi:D", "*:S"],
        CommandResult::success(vec!["line one".to_string(), "line two".to_string()]),
    );
    let local = host.path().join("instant.log");

    let mut step = LogcatStep {
        output_mode: LogcatOutputMode::LocalFile,
        local_file: Some(local.clone()),
        filter_pairs: vec![FilterPair::new("Wifi", LogcatPriority::Debug)],
        default_filter_priority: Some(LogcatPriority::Silent),
        ..LogcatStep::default()
    };
    let verdict = with_timeout(run_step(&mut step, &adb)).await.unwrap();

    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(
        std::fs::read_to_string(local).unwrap(),
        "line one\nline two\n"
    );
}

#[tokio::test]
async fn clear_logcat_runs_logcat_c() {
    let (_device, _host, adb) = setup();
    let mut step = ClearLogcatStep::default();
    let verdict = with_timeout(run_step(&mut step, &adb)).await.unwrap();

    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(adb.command_lines(), vec!["logcat -c"]);
}

#[tokio::test]
async fn continuous_rotating_capture_is_collected_and_deleted() {
    let (_device, host, adb) = setup();
    adb.put_device_file("/sdcard/cap.log.3", "stale\n");

    let mut capture = LogcatStep {
        execution_mode: LogcatExecutionMode::Continuous,
        device_file: "/sdcard/cap.log".to_string(),
        rotate_files: true,
        ..LogcatStep::default()
    };
    assert_eq!(
        with_timeout(run_step(&mut capture, &adb)).await.unwrap(),
        Verdict::Pass
    );

    // Stale files from an earlier capture are gone before logcat starts.
    assert!(!adb.device_file_exists("/sdcard/cap.log.3"));
    let calls = adb.calls();
    assert_eq!(calls[0].args.to_string(), "shell rm -f /sdcard/cap.log*");
    assert!(calls[1].is_background());
    assert_eq!(
        calls[1].args.to_string(),
        "logcat -b main -f /sdcard/cap.log -v threadtime -r 16 -n 4"
    );

    // What logcat would have written meanwhile.
    adb.put_device_file("/sdcard/cap.log.1", "older\n");
    adb.put_device_file("/sdcard/cap.log", "newer\n");

    let local = host.path().join("capture.log");
    let mut retrieve = RetrieveBackgroundLogcatStep {
        delete_files: true,
        scratch_root: Some(host.path().to_path_buf()),
        ..RetrieveBackgroundLogcatStep::new(capture.background.take().unwrap(), &local)
    };
    let verdict = with_timeout(run_step(&mut retrieve, &adb)).await.unwrap();

    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(std::fs::read_to_string(&local).unwrap(), "older\nnewer\n");
    assert!(!adb.device_file_exists("/sdcard/cap.log"));
    assert!(!adb.device_file_exists("/sdcard/cap.log.1"));
    assert!(adb.background_handles()[0].is_finished());
}

#[tokio::test]
async fn single_file_capture_fails_when_the_pull_fails() {
    let (_device, host, adb) = setup();

    let mut capture = LogcatStep {
        execution_mode: LogcatExecutionMode::Continuous,
        device_file: "/sdcard/single.log".to_string(),
        ..LogcatStep::default()
    };
    with_timeout(run_step(&mut capture, &adb)).await.unwrap();
    adb.fail_pull("/sdcard/single.log");

    let local: PathBuf = host.path().join("single.log");
    let mut retrieve =
        RetrieveBackgroundLogcatStep::new(capture.background.take().unwrap(), &local);
    let verdict = with_timeout(run_step(&mut retrieve, &adb)).await.unwrap();

    assert_eq!(verdict, Verdict::Fail);
}

#[tokio::test]
async fn retrieve_without_background_is_not_runnable() {
    let (_device, host, adb) = setup();
    let mut retrieve = RetrieveBackgroundLogcatStep {
        local_file: Some(host.path().join("x.log")),
        ..RetrieveBackgroundLogcatStep::default()
    };
    assert!(with_timeout(run_step(&mut retrieve, &adb)).await.is_err());
}
