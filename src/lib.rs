// src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logcat;
pub mod logging;
pub mod steps;
pub mod types;

use anyhow::{Context, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{CliArgs, CliCommand, LogcatArgs};
use crate::commands::LogcatPriority;
use crate::config::{ConfigFile, default_config_path, load_and_validate, load_or_default};
use crate::exec::{AdbArgs, AdbBackend, AdbExecutor};
use crate::steps::{
    ClearLogcatStep, FilterPair, LogcatExecutionMode, LogcatOutputMode, LogcatStep,
    RetrieveBackgroundLogcatStep, Verdict, run_step,
};
use crate::types::CommandResult;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the executor
/// - Ctrl-C handling
/// - one subcommand
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;
    config::validate_paths(&cfg)?;

    let executor = AdbExecutor::from_config(&cfg);

    let interrupt = CancellationToken::new();
    spawn_interrupt_handler(
        tokio::signal::ctrl_c,
        interrupt.clone(),
        executor.cancel_token().clone(),
    );

    let device = args.device.as_deref();
    let outcome = match args.command {
        CliCommand::Logcat(logcat) if logcat.continuous => {
            run_continuous_logcat(&executor, &logcat, device, &interrupt).await
        }
        command => {
            // One-shot commands: the first Ctrl-C already aborts adb.
            let exec_token = executor.cancel_token().clone();
            let forward = interrupt.clone();
            tokio::spawn(async move {
                forward.cancelled().await;
                exec_token.cancel();
            });
            run_command(&executor, command, device).await
        }
    };

    executor.close().await;
    outcome
}

/// First interrupt cancels `stop`; a second one cancels `abort`, which kills
/// whatever adb command is still running. `next_interrupt` is
/// `tokio::signal::ctrl_c` outside of tests.
fn spawn_interrupt_handler<F, Fut>(
    mut next_interrupt: F,
    stop: CancellationToken,
    abort: CancellationToken,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = std::io::Result<()>> + Send,
{
    tokio::spawn(async move {
        if next_interrupt().await.is_err() {
            return;
        }
        info!("Ctrl-C received; stopping (press again to abort)");
        stop.cancel();

        if next_interrupt().await.is_ok() {
            warn!("second Ctrl-C received; aborting running adb commands");
            abort.cancel();
        }
    });
}

fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let cfg = match &args.config {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_or_default(default_config_path())?,
    };
    Ok(cfg)
}

async fn run_command(
    executor: &AdbExecutor,
    command: CliCommand,
    device: Option<&str>,
) -> Result<()> {
    let result = match command {
        CliCommand::Exec { args } => {
            executor
                .execute(AdbArgs::from(args), device, executor.default_options())
                .await
        }
        CliCommand::Push { local, remote } => executor.push(&local, &remote, device).await,
        CliCommand::Pull { remote, local } => executor.pull(&remote, &local, device).await,
        CliCommand::Install(install) => {
            executor
                .install(&install.apk, &install.options(), device)
                .await
        }
        CliCommand::Uninstall { package } => executor.uninstall(&package, device).await,
        CliCommand::Reboot => executor.reboot(device).await,
        CliCommand::Airplane { state } => {
            executor.set_airplane_mode(state.enabled(), device).await
        }
        CliCommand::Dumpsys { service } => executor.dumpsys(&service, device).await,
        CliCommand::StartApp { package } => executor.start_app(&package, device).await,
        CliCommand::ClearLogcat => {
            let mut step = ClearLogcatStep {
                device_id: device.map(str::to_string),
            };
            return expect_pass(run_step(&mut step, executor).await?, "clear logcat");
        }
        CliCommand::Logcat(logcat) => return run_instant_logcat(executor, &logcat, device).await,
    };

    print_result(&result)
}

fn print_result(result: &CommandResult) -> Result<()> {
    for line in &result.output {
        println!("{line}");
    }
    if !result.success {
        bail!("adb command was {result}");
    }
    Ok(())
}

fn expect_pass(verdict: Verdict, what: &str) -> Result<()> {
    if verdict == Verdict::Fail {
        bail!("{what} failed");
    }
    Ok(())
}

fn logcat_step(logcat: &LogcatArgs, device: Option<&str>) -> Result<LogcatStep> {
    let mut step = LogcatStep {
        device_id: device.map(str::to_string),
        format: logcat.format,
        device_file: logcat.device_file.clone(),
        rotate_files: logcat.rotate,
        rotate_kbytes: logcat.rotate_size,
        rotate_count: logcat.rotate_count,
        local_file: logcat.output.clone(),
        ..LogcatStep::default()
    };
    if !logcat.buffers.is_empty() {
        step.buffers = logcat.buffers.iter().copied().collect();
    }

    for filter in &logcat.filters {
        let (tag, priority) = filter
            .rsplit_once(':')
            .with_context(|| format!("filter '{filter}' is not of the form TAG:PRIORITY"))?;
        let priority: LogcatPriority = priority.parse()?;
        if tag.trim() == "*" {
            step.default_filter_priority = Some(priority);
        } else {
            step.filter_pairs.push(FilterPair::new(tag.trim(), priority));
        }
    }
    Ok(step)
}

async fn run_instant_logcat(
    executor: &AdbExecutor,
    logcat: &LogcatArgs,
    device: Option<&str>,
) -> Result<()> {
    let step = logcat_step(logcat, device)?;

    if step.local_file.is_none() {
        // Straight to stdout.
        let args = step.build_command()?.build();
        let result = executor
            .execute(args, device, executor.default_options())
            .await;
        return print_result(&result);
    }

    let mut step = LogcatStep {
        output_mode: LogcatOutputMode::LocalFile,
        ..step
    };
    expect_pass(run_step(&mut step, executor).await?, "logcat")
}

async fn run_continuous_logcat(
    executor: &AdbExecutor,
    logcat: &LogcatArgs,
    device: Option<&str>,
    interrupt: &CancellationToken,
) -> Result<()> {
    let Some(output) = logcat.output.clone() else {
        bail!("--continuous needs --output");
    };

    let mut step = LogcatStep {
        execution_mode: LogcatExecutionMode::Continuous,
        ..logcat_step(logcat, device)?
    };
    run_step(&mut step, executor).await?;
    let background = step
        .background
        .take()
        .context("continuous logcat did not start")?;

    info!(
        file = background.device_file(),
        "capturing logcat on the device; press Ctrl-C to stop"
    );
    tokio::select! {
        _ = interrupt.cancelled() => {}
        exit = background.process().wait() => {
            warn!(?exit, "logcat exited before it was stopped");
        }
    }

    let mut retrieve = RetrieveBackgroundLogcatStep {
        delete_files: logcat.delete,
        scratch_root: logcat.scratch_dir.clone(),
        ..RetrieveBackgroundLogcatStep::new(background, &output)
    };
    let verdict = run_step(&mut retrieve, executor).await?;
    if verdict != Verdict::Fail {
        info!(path = %output.display(), "logcat saved");
    }
    expect_pass(verdict, "retrieving logcat")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Semaphore;

    use super::*;

    #[tokio::test]
    async fn second_interrupt_aborts_running_commands() {
        let presses = Arc::new(Semaphore::new(0));
        let stop = CancellationToken::new();
        let abort = CancellationToken::new();

        let source = Arc::clone(&presses);
        spawn_interrupt_handler(
            move || {
                let source = Arc::clone(&source);
                async move {
                    source
                        .acquire()
                        .await
                        .map(|permit| permit.forget())
                        .map_err(std::io::Error::other)
                }
            },
            stop.clone(),
            abort.clone(),
        );

        presses.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), stop.cancelled())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!abort.is_cancelled());

        presses.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), abort.cancelled())
            .await
            .unwrap();
    }
}
