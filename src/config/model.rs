// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::RemoteServer;
use crate::types::ExecOptions;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [adb]
/// path = "/usr/bin/adb"
///
/// [remote]
/// host = "10.0.0.5"
/// port = 5037
///
/// [execution]
/// timeout_ms = 10000
/// long_timeout_ms = 30000
/// retries = 3
/// retry_wait_ms = 5000
/// ```
///
/// Every section is optional. Without `[remote]` commands go to the local
/// adb server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub adb: AdbSection,

    #[serde(default)]
    pub remote: Option<RemoteSection>,

    #[serde(default)]
    pub execution: ExecutionSection,
}

/// `[adb]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdbSection {
    /// Path to the adb executable. A bare name is looked up on `PATH`.
    #[serde(default = "default_adb_path")]
    pub path: PathBuf,
}

fn default_adb_path() -> PathBuf {
    PathBuf::from("adb")
}

impl Default for AdbSection {
    fn default() -> Self {
        Self {
            path: default_adb_path(),
        }
    }
}

/// `[remote]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    pub host: String,

    #[serde(default = "default_remote_port")]
    pub port: u16,
}

fn default_remote_port() -> u16 {
    RemoteServer::DEFAULT_PORT
}

/// `[execution]` section: timing policy for foreground commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionSection {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Used for push, pull, install and uninstall.
    #[serde(default = "default_long_timeout_ms")]
    pub long_timeout_ms: u64,

    /// Total attempts per command.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_wait_ms")]
    pub retry_wait_ms: u64,
}

fn default_timeout_ms() -> u64 {
    ExecOptions::DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_long_timeout_ms() -> u64 {
    ExecOptions::LONG_TIMEOUT.as_millis() as u64
}

fn default_retries() -> u32 {
    ExecOptions::DEFAULT_RETRIES
}

fn default_retry_wait_ms() -> u64 {
    ExecOptions::DEFAULT_RETRY_WAIT.as_millis() as u64
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            long_timeout_ms: default_long_timeout_ms(),
            retries: default_retries(),
            retry_wait_ms: default_retry_wait_ms(),
        }
    }
}

impl ExecutionSection {
    pub fn defaults(&self) -> ExecOptions {
        ExecOptions::new(
            Duration::from_millis(self.timeout_ms),
            self.retries,
            Duration::from_millis(self.retry_wait_ms),
        )
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_millis(self.long_timeout_ms)
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub adb: AdbSection,
    pub remote: Option<RemoteServer>,
    pub execution: ExecutionSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        adb: AdbSection,
        remote: Option<RemoteServer>,
        execution: ExecutionSection,
    ) -> Self {
        Self {
            adb,
            remote,
            execution,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(AdbSection::default(), None, ExecutionSection::default())
    }
}
