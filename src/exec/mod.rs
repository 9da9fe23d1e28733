// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs the adb executable with `tokio::process::Command` and
//! turns each run into a [`CommandResult`](crate::types::CommandResult).
//!
//! - [`args`] builds argument vectors (remote server and device selectors).
//! - [`collector`] captures stdout/stderr lines from a running process.
//! - [`process`] owns one child process, its supervisor task and its output.
//! - [`registry`] tracks background processes until they exit or are closed.
//! - [`executor`] provides foreground (timeout + retry) and background
//!   execution on top of those.
//! - [`backend`] provides the `AdbBackend` trait that higher layers use, so
//!   tests can substitute a fake device.

pub mod args;
pub mod backend;
pub mod collector;
pub mod executor;
pub mod process;
pub mod registry;

pub use args::{AdbArgs, RemoteServer};
pub use backend::{AdbBackend, BoxFuture};
pub use collector::OutputCollector;
pub use executor::{AdbExecutor, ExecutorSettings};
pub use process::{ExitCallback, ProcessExit, ProcessHandle};
pub use registry::BackgroundRegistry;
