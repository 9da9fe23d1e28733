// src/exec/process.rs

//! A single adb child process and its captured output.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::errors::{AdbError, Result};
use crate::exec::args::AdbArgs;
use crate::exec::collector::OutputCollector;
use crate::types::CommandResult;

/// How long the exit path waits for the output readers to hit end-of-stream.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Upper bound on waiting for a killed process to be reaped.
const KILL_WAIT: Duration = Duration::from_secs(5);

/// Invoked once, from the supervisor task, after the process has exited and
/// its output has been drained, but before the exit becomes observable
/// through [`ProcessHandle::wait`] or [`ProcessHandle::is_finished`].
pub type ExitCallback = Box<dyn FnOnce() + Send + 'static>;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, if the OS reported one (absent when killed by a signal).
    pub code: Option<i32>,
    /// Whether the exit followed a kill request from this handle.
    pub killed: bool,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

enum ProcessState {
    /// Created but not launched yet.
    Pending,
    Running {
        kill_tx: Option<oneshot::Sender<()>>,
        /// Set as soon as the child is reaped, before output is drained.
        reaped_rx: watch::Receiver<Option<ProcessExit>>,
        exit_rx: watch::Receiver<Option<ProcessExit>>,
    },
    /// Terminated through this handle; the process must not be touched again.
    Released { exit: Option<ProcessExit> },
}

/// Owns one adb process (through its supervisor task) plus its
/// [`OutputCollector`].
///
/// The supervisor task holds the `tokio::process::Child` and selects between
/// the process exiting on its own and a kill request, the same shape as a
/// cancellable task runner. The handle talks to it through a `oneshot` kill
/// channel and observes the exit on a `watch` channel.
pub struct ProcessHandle {
    id: u64,
    executable: PathBuf,
    arguments: AdbArgs,
    collector: Arc<OutputCollector>,
    state: Mutex<ProcessState>,
    pid: Mutex<Option<u32>>,
    result: Mutex<Option<CommandResult>>,
}

impl ProcessHandle {
    /// Create a handle without launching anything yet.
    pub fn new(executable: impl AsRef<Path>, arguments: AdbArgs) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            executable: executable.as_ref().to_path_buf(),
            arguments,
            collector: OutputCollector::new(),
            state: Mutex::new(ProcessState::Pending),
            pid: Mutex::new(None),
            result: Mutex::new(None),
        })
    }

    /// Launch the process and start capturing its output.
    ///
    /// `on_exit` runs once the process has exited on its own or after a kill.
    /// If launching fails, `on_exit` is dropped without being called.
    pub fn start(self: &Arc<Self>, on_exit: Option<ExitCallback>) -> Result<()> {
        if !matches!(*self.state.lock(), ProcessState::Pending) {
            return Err(AdbError::InvalidArgument(format!(
                "process '{self}' was already started"
            )));
        }

        let mut cmd = Command::new(&self.executable);
        cmd.args(self.arguments.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| AdbError::Launch {
            command: self.to_string(),
            source,
        })?;

        *self.pid.lock() = child.id();
        self.collector
            .attach(child.stdout.take(), child.stderr.take());

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let (reaped_tx, reaped_rx) = watch::channel::<Option<ProcessExit>>(None);
        let (exit_tx, exit_rx) = watch::channel::<Option<ProcessExit>>(None);

        *self.state.lock() = ProcessState::Running {
            kill_tx: Some(kill_tx),
            reaped_rx,
            exit_rx,
        };

        tokio::spawn(supervise(
            child,
            kill_rx,
            reaped_tx,
            exit_tx,
            Arc::clone(&self.collector),
            on_exit,
            self.to_string(),
        ));

        Ok(())
    }

    /// Unique identity of this handle within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(&self) -> &AdbArgs {
        &self.arguments
    }

    /// OS process id, once launched.
    pub fn pid(&self) -> Option<u32> {
        *self.pid.lock()
    }

    /// True if there is no live process behind this handle: never started,
    /// already exited, or released by [`ProcessHandle::terminate`].
    pub fn is_finished(&self) -> bool {
        match &*self.state.lock() {
            ProcessState::Pending | ProcessState::Released { .. } => true,
            ProcessState::Running { exit_rx, .. } => exit_rx.borrow().is_some(),
        }
    }

    /// Lines captured so far.
    pub fn output(&self) -> Vec<String> {
        self.collector.snapshot()
    }

    pub fn collector(&self) -> &Arc<OutputCollector> {
        &self.collector
    }

    /// Cached result of [`ProcessHandle::terminate`], if it has run.
    pub fn result(&self) -> Option<CommandResult> {
        self.result.lock().clone()
    }

    /// Wait until the process has exited (and its output has been drained).
    ///
    /// Returns `None` if the process was never launched.
    pub async fn wait(&self) -> Option<ProcessExit> {
        let mut exit_rx = match &*self.state.lock() {
            ProcessState::Pending => return None,
            ProcessState::Released { exit } => return *exit,
            ProcessState::Running { exit_rx, .. } => exit_rx.clone(),
        };

        match exit_rx.wait_for(Option::is_some).await {
            Ok(exit) => *exit,
            Err(_) => None,
        }
    }

    /// Wait until the OS reports the process gone, without waiting for its
    /// output to be drained. Output left in the pipes (for example, held open
    /// by a grandchild) may still arrive until [`ProcessHandle::wait`]
    /// returns.
    ///
    /// Returns `None` if the process was never launched.
    pub async fn reaped(&self) -> Option<ProcessExit> {
        let mut reaped_rx = match &*self.state.lock() {
            ProcessState::Pending => return None,
            ProcessState::Released { exit } => return *exit,
            ProcessState::Running { reaped_rx, .. } => reaped_rx.clone(),
        };

        match reaped_rx.wait_for(Option::is_some).await {
            Ok(exit) => *exit,
            Err(_) => None,
        }
    }

    /// Ask the supervisor to kill the process and wait (bounded) for the exit.
    ///
    /// Killing a process that already exited is not an error.
    pub async fn kill(&self) -> Option<ProcessExit> {
        let (kill_tx, mut exit_rx) = match &mut *self.state.lock() {
            ProcessState::Pending => return None,
            ProcessState::Released { exit } => return *exit,
            ProcessState::Running {
                kill_tx,
                exit_rx,
                ..
            } => (kill_tx.take(), exit_rx.clone()),
        };

        if let Some(kill_tx) = kill_tx {
            if kill_tx.send(()).is_err() {
                debug!(cmd = %self, "supervisor already gone while requesting kill");
            }
        }

        match tokio::time::timeout(KILL_WAIT, exit_rx.wait_for(Option::is_some)).await {
            Ok(Ok(exit)) => *exit,
            Ok(Err(_)) => None,
            Err(_) => {
                warn!(cmd = %self, timeout = ?KILL_WAIT, "process did not exit after kill");
                None
            }
        }
    }

    /// Stop the process and return its final result.
    ///
    /// Idempotent: the first call kills the process (if still running),
    /// snapshots the output and releases the process; every later call
    /// returns the same cached result.
    ///
    /// The result counts as successful when the process has exited by the
    /// time termination completes, whatever its exit code: stopping it was
    /// the caller's intent.
    pub async fn terminate(&self) -> CommandResult {
        if let Some(result) = self.result() {
            return result;
        }

        let exit = if self.is_finished() {
            warn!(cmd = %self, "background process already terminated");
            self.wait().await
        } else {
            info!(cmd = %self, "terminating background process");
            self.kill().await
        };

        self.collector.close();
        let result = CommandResult::new(exit.is_some(), self.collector.snapshot());

        // Release the process; only the recorded exit survives.
        *self.state.lock() = ProcessState::Released { exit };

        self.result.lock().get_or_insert(result).clone()
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = format!("{} {}", self.executable.display(), self.arguments);
        f.write_str(line.trim())
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("id", &self.id)
            .field("command", &self.to_string())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

/// Owns the child for its whole life. Either the process exits on its own or
/// a kill request arrives; a dropped kill sender (handle gone) also kills it.
async fn supervise(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    reaped_tx: watch::Sender<Option<ProcessExit>>,
    exit_tx: watch::Sender<Option<ProcessExit>>,
    collector: Arc<OutputCollector>,
    on_exit: Option<ExitCallback>,
    label: String,
) {
    let (status, killed) = tokio::select! {
        status = child.wait() => (status, false),

        request = &mut kill_rx => {
            match request {
                Ok(()) => debug!(cmd = %label, "kill requested; killing process"),
                Err(_) => debug!(cmd = %label, "process handle dropped; killing orphaned process"),
            }
            if let Err(e) = child.start_kill() {
                warn!(cmd = %label, error = %e, "failed to kill process (it may have already exited)");
            }
            (child.wait().await, true)
        }
    };

    let exit = match status {
        Ok(status) => ProcessExit {
            code: status.code(),
            killed,
        },
        Err(e) => {
            error!(cmd = %label, error = %e, "failed waiting for process exit");
            ProcessExit { code: None, killed }
        }
    };

    reaped_tx.send_replace(Some(exit));

    collector.drain(OUTPUT_DRAIN_GRACE).await;

    debug!(cmd = %label, exit_code = ?exit.code, killed, "process exited");

    // Callback first: anyone woken by the exit already sees its effects
    // (e.g. the handle gone from the background registry).
    if let Some(on_exit) = on_exit {
        on_exit();
    }

    exit_tx.send_replace(Some(exit));
}
