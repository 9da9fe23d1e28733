// src/steps/mod.rs

//! Test-plan steps driving a device through an [`AdbBackend`].
//!
//! A host (a test sequencer, the CLI) configures a step, calls
//! [`Step::pre_plan_run`] once before the plan starts, checks
//! [`Step::validate`], then calls [`Step::run`] for a [`Verdict`].
//!
//! - [`command`]: generic adb commands (custom, push, pull, install, ...).
//! - [`logcat`]: logcat capture, clearing, and background retrieval.
//! - [`am`]: activity manager commands.

pub mod am;
pub mod command;
pub mod logcat;

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::errors::{AdbError, Result};
use crate::exec::{AdbBackend, BoxFuture};
use crate::types::{CommandResult, ExecOptions};

pub use am::ActivityManagerStep;
pub use command::{AdbCommand, AdbCommandStep};
pub use logcat::{
    ClearLogcatStep, FilterPair, LogcatExecutionMode, LogcatOutputMode, LogcatStep,
    RetrieveBackgroundLogcatStep,
};

/// Outcome of a step. Verdicts only ever get worse: see [`Verdict::upgrade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Verdict {
    #[default]
    NotSet,
    Pass,
    Fail,
}

impl Verdict {
    /// Keep the more severe of the two.
    pub fn upgrade(&mut self, other: Verdict) {
        if other > *self {
            *self = other;
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::NotSet => "not set",
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// A setting that would make the step misbehave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub trait Step: Send {
    fn name(&self) -> &'static str;

    /// Every rule the current settings break. Empty means runnable.
    fn validate(&self) -> Vec<ValidationError>;

    /// Normalise settings before a plan runs.
    fn pre_plan_run(&mut self) {}

    fn run<'a>(&'a mut self, backend: &'a dyn AdbBackend) -> BoxFuture<'a, Result<Verdict>>;
}

/// `pre_plan_run`, `validate`, then `run`. Validation failures become
/// [`AdbError::InvalidArgument`] without touching the device.
pub async fn run_step(step: &mut dyn Step, backend: &dyn AdbBackend) -> Result<Verdict> {
    step.pre_plan_run();

    let errors = step.validate();
    if !errors.is_empty() {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AdbError::InvalidArgument(format!(
            "step '{}' is not runnable: {joined}",
            step.name()
        )));
    }

    let verdict = step.run(backend).await?;
    debug!(step = step.name(), %verdict, "step finished");
    Ok(verdict)
}

/// Retry and timeout settings shared by command-style steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSettings {
    pub retries: u32,
    pub retry_wait_ms: u64,
    pub timeout_ms: u64,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_wait_ms: 5_000,
            timeout_ms: 30_000,
        }
    }
}

impl CommandSettings {
    pub fn validate(&self, errors: &mut Vec<ValidationError>) {
        if self.retries == 0 {
            errors.push(ValidationError::new(
                "retries",
                "number of retries must be greater than zero",
            ));
        }
        if self.retry_wait_ms == 0 {
            errors.push(ValidationError::new(
                "retry_wait_ms",
                "retry wait must be greater than zero",
            ));
        }
        if self.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "timeout_ms",
                "timeout must be greater than zero",
            ));
        }
    }

    pub fn options(&self) -> ExecOptions {
        ExecOptions::new(
            Duration::from_millis(self.timeout_ms),
            self.retries,
            Duration::from_millis(self.retry_wait_ms),
        )
    }
}

/// Fold a command result into the step verdict and log its output.
pub(crate) fn handle_result(verdict: &mut Verdict, result: &CommandResult) -> bool {
    verdict.upgrade(if result.success {
        Verdict::Pass
    } else {
        Verdict::Fail
    });
    result.log_output();
    result.success
}

/// Blank-aware check for required text settings.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
