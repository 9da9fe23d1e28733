use std::fmt;
use std::time::Duration;

use tracing::debug;

/// Outcome of running one adb command.
///
/// This is the only data contract handed to calling workflows: `success`
/// drives pass/fail verdicts, `output` is always available for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub output: Vec<String>,
}

impl CommandResult {
    pub fn new(success: bool, output: Vec<String>) -> Self {
        Self { success, output }
    }

    pub fn success(output: Vec<String>) -> Self {
        Self::new(true, output)
    }

    pub fn failure(output: Vec<String>) -> Self {
        Self::new(false, output)
    }

    /// Dump the outcome and every output line at debug level.
    pub fn log_output(&self) {
        debug!("command was {self}");
        debug!("------ start of adb output ------");
        for line in &self.output {
            debug!("{line}");
        }
        debug!("------- end of adb output -------");
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} line(s) of output)",
            if self.success { "successful" } else { "not successful" },
            self.output.len()
        )
    }
}

/// Timeout and retry policy for one foreground command.
///
/// `retries` is the total number of attempts: `1` runs the command once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_wait: Duration,
}

impl ExecOptions {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
    pub const LONG_TIMEOUT: Duration = Duration::from_millis(30_000);
    pub const DEFAULT_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(5_000);

    pub fn new(timeout: Duration, retries: u32, retry_wait: Duration) -> Self {
        Self {
            timeout,
            retries,
            retry_wait,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    /// Single attempt, used for best-effort cleanup commands.
    pub fn once(mut self) -> Self {
        self.retries = 1;
        self
    }
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_TIMEOUT,
            Self::DEFAULT_RETRIES,
            Self::DEFAULT_RETRY_WAIT,
        )
    }
}
