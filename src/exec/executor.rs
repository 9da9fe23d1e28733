// src/exec/executor.rs

//! Foreground (timeout + retry) and background execution of adb commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::types::{CommandResult, ExecOptions};

use super::args::{self, AdbArgs, RemoteServer};
use super::backend::{AdbBackend, BoxFuture};
use super::process::{ExitCallback, ProcessExit, ProcessHandle};
use super::registry::BackgroundRegistry;

/// Where adb lives, how to reach the server, and the default timing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub executable: PathBuf,
    /// `None` talks to the local adb server.
    pub remote: Option<RemoteServer>,
    pub defaults: ExecOptions,
    /// Timeout for transfers and package management.
    pub long_timeout: Duration,
}

impl ExecutorSettings {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    pub fn with_remote(mut self, remote: RemoteServer) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_defaults(mut self, defaults: ExecOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_long_timeout(mut self, long_timeout: Duration) -> Self {
        self.long_timeout = long_timeout;
        self
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("adb"),
            remote: None,
            defaults: ExecOptions::default(),
            long_timeout: ExecOptions::LONG_TIMEOUT,
        }
    }
}

impl From<&ConfigFile> for ExecutorSettings {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            executable: cfg.adb.path.clone(),
            remote: cfg.remote.clone(),
            defaults: cfg.execution.defaults(),
            long_timeout: cfg.execution.long_timeout(),
        }
    }
}

enum AttemptOutcome {
    Exited(Option<ProcessExit>),
    TimedOut,
    Cancelled,
}

/// Runs adb commands on behalf of one configured adb installation.
///
/// Foreground commands are awaited with a timeout and retried; background
/// commands are registered and handed back to the caller. Background
/// processes still alive at [`AdbExecutor::close`] are terminated.
#[derive(Debug)]
pub struct AdbExecutor {
    settings: ExecutorSettings,
    registry: Arc<BackgroundRegistry>,
    cancel: CancellationToken,
}

impl AdbExecutor {
    pub fn new(settings: ExecutorSettings) -> Self {
        Self {
            settings,
            registry: BackgroundRegistry::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(ExecutorSettings::from(cfg))
    }

    /// Use an externally owned token; cancelling it aborts foreground waits
    /// and retry sleeps.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn executable(&self) -> &Path {
        &self.settings.executable
    }

    pub fn registry(&self) -> &Arc<BackgroundRegistry> {
        &self.registry
    }

    /// Full argument vector for one invocation, remote and device selectors
    /// included.
    pub fn assemble_arguments(&self, args: AdbArgs, device_id: Option<&str>) -> AdbArgs {
        args::assemble(self.settings.remote.as_ref(), device_id, args)
    }

    /// Run a command to completion.
    ///
    /// An attempt succeeds when the process exits within `options.timeout`
    /// with code 0. Failed attempts are retried until `options.retries`
    /// attempts have been made (`0` counts as `1`), sleeping
    /// `options.retry_wait` in between. Only the last attempt's output is
    /// returned. Cancellation ends the loop with a failed result.
    pub async fn execute_foreground(
        &self,
        args: AdbArgs,
        device_id: Option<&str>,
        options: ExecOptions,
    ) -> CommandResult {
        let args = self.assemble_arguments(args, device_id);
        let attempts = options.retries.max(1);

        let mut result = CommandResult::default();
        for attempt in 1..=attempts {
            if attempt > 1 {
                warn!(
                    cmd = %args,
                    attempt,
                    retries = attempts,
                    wait = ?options.retry_wait,
                    "adb command failed; retrying"
                );
                let cancelled = tokio::select! {
                    _ = self.cancel.cancelled() => true,
                    _ = tokio::time::sleep(options.retry_wait) => false,
                };
                if cancelled {
                    info!(cmd = %args, "cancelled while waiting to retry");
                    break;
                }
            }

            if self.cancel.is_cancelled() {
                info!(cmd = %args, "cancelled before launching adb");
                break;
            }

            result = self.run_attempt(&args, options.timeout).await;
            if result.success || self.cancel.is_cancelled() {
                break;
            }
        }
        result
    }

    async fn run_attempt(&self, args: &AdbArgs, timeout: Duration) -> CommandResult {
        let handle = ProcessHandle::new(&self.settings.executable, args.clone());
        debug!(cmd = %handle, ?timeout, "running adb command");

        if let Err(e) = handle.start(None) {
            error!(cmd = %handle, error = %e, "failed to launch adb");
            return CommandResult::failure(Vec::new());
        }

        let outcome = tokio::select! {
            exit = handle.reaped() => AttemptOutcome::Exited(exit),
            _ = tokio::time::sleep(timeout) => AttemptOutcome::TimedOut,
            _ = self.cancel.cancelled() => AttemptOutcome::Cancelled,
        };

        if matches!(outcome, AttemptOutcome::Exited(_)) {
            // Trailing output; bounded by the drain grace, not by `timeout`.
            handle.wait().await;
        }

        match outcome {
            AttemptOutcome::Exited(Some(exit)) if exit.success() => {
                CommandResult::success(handle.output())
            }
            AttemptOutcome::Exited(exit) => {
                error!(
                    cmd = %handle,
                    exit_code = ?exit.and_then(|e| e.code),
                    "adb command exited unsuccessfully"
                );
                CommandResult::failure(handle.output())
            }
            AttemptOutcome::TimedOut => {
                error!(cmd = %handle, ?timeout, "adb command timed out; killing it");
                handle.kill().await;
                CommandResult::failure(handle.output())
            }
            AttemptOutcome::Cancelled => {
                info!(cmd = %handle, "cancellation requested; killing adb command");
                handle.kill().await;
                CommandResult::failure(handle.output())
            }
        }
    }

    /// Launch a command that runs until terminated, and track it.
    ///
    /// The handle is registered before the process starts, and removed again
    /// as soon as the process exits on its own. Must be called from within a
    /// Tokio runtime.
    pub fn execute_background(
        &self,
        args: AdbArgs,
        device_id: Option<&str>,
    ) -> Result<Arc<ProcessHandle>> {
        let args = self.assemble_arguments(args, device_id);
        let handle = ProcessHandle::new(&self.settings.executable, args);

        self.registry.add(Arc::clone(&handle));

        let registry = Arc::downgrade(&self.registry);
        let id = handle.id();
        let on_exit: ExitCallback = Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove_id(id);
            }
        });

        if let Err(e) = handle.start(Some(on_exit)) {
            self.registry.remove(&handle);
            error!(cmd = %handle, error = %e, "failed to launch background adb command");
            return Err(e);
        }

        info!(cmd = %handle, pid = ?handle.pid(), "started background adb command");
        Ok(handle)
    }

    /// Stop a background command previously returned by
    /// [`AdbExecutor::execute_background`].
    pub async fn terminate(&self, handle: &ProcessHandle) -> CommandResult {
        self.registry.remove(handle);
        handle.terminate().await
    }

    /// Terminate every background command that is still running.
    pub async fn close(&self) {
        let remaining = self.registry.len();
        if remaining == 0 {
            debug!("no background adb commands left on close");
            return;
        }
        let terminated = self.registry.drain_and_terminate_all().await;
        info!(remaining, terminated, "closed background adb commands");
    }
}

impl AdbBackend for AdbExecutor {
    fn execute<'a>(
        &'a self,
        args: AdbArgs,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        Box::pin(self.execute_foreground(args, device_id, options))
    }

    fn execute_background(
        &self,
        args: AdbArgs,
        device_id: Option<&str>,
    ) -> Result<Arc<ProcessHandle>> {
        AdbExecutor::execute_background(self, args, device_id)
    }

    fn default_options(&self) -> ExecOptions {
        self.settings.defaults
    }

    fn long_options(&self) -> ExecOptions {
        self.settings.defaults.with_timeout(self.settings.long_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_settings_prefix_every_command() {
        let executor = AdbExecutor::new(
            ExecutorSettings::new("/opt/adb").with_remote(RemoteServer::new("lab-host", 5037)),
        );
        let args = executor.assemble_arguments(AdbArgs::from(["devices"]), Some("R58M"));
        assert_eq!(args.to_string(), "-H lab-host -P 5037 -s R58M devices");
    }

    #[test]
    fn long_options_only_change_the_timeout() {
        let defaults = ExecOptions::default().with_retries(5);
        let executor = AdbExecutor::new(
            ExecutorSettings::default()
                .with_defaults(defaults)
                .with_long_timeout(Duration::from_secs(90)),
        );
        let long = executor.long_options();
        assert_eq!(long.timeout, Duration::from_secs(90));
        assert_eq!(long.retries, 5);
        assert_eq!(long.retry_wait, defaults.retry_wait);
    }

    #[tokio::test]
    async fn missing_executable_is_a_failed_result() {
        let executor = AdbExecutor::new(ExecutorSettings::new("/nonexistent/adb-binary"));
        let options = ExecOptions::default()
            .with_retries(2)
            .with_retry_wait(Duration::from_millis(10));
        let result = executor
            .execute_foreground(AdbArgs::from(["devices"]), None, options)
            .await;
        assert!(!result.success);
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    async fn background_launch_failure_is_an_error_and_not_registered() {
        let executor = AdbExecutor::new(ExecutorSettings::new("/nonexistent/adb-binary"));
        let err = executor.execute_background(AdbArgs::from(["logcat"]), None);
        assert!(err.is_err());
        assert!(executor.registry().is_empty());
    }

    #[tokio::test]
    async fn cancelled_executor_returns_failure_quickly() {
        let executor = AdbExecutor::new(ExecutorSettings::new("/nonexistent/adb-binary"));
        executor.cancel_token().cancel();
        let options = ExecOptions::default().with_retry_wait(Duration::from_secs(60));
        let started = std::time::Instant::now();
        let result = executor
            .execute_foreground(AdbArgs::from(["devices"]), None, options)
            .await;
        assert!(!result.success);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
