// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AdbError, Result};
use crate::exec::RemoteServer;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AdbError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let remote = raw
            .remote
            .map(|r| RemoteServer::new(r.host.trim(), r.port));
        Ok(ConfigFile::new_unchecked(raw.adb, remote, raw.execution))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_adb(cfg)?;
    validate_remote(cfg)?;
    validate_execution(cfg)?;
    Ok(())
}

fn validate_adb(cfg: &RawConfigFile) -> Result<()> {
    if cfg.adb.path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(AdbError::Config("[adb].path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_remote(cfg: &RawConfigFile) -> Result<()> {
    let Some(remote) = &cfg.remote else {
        return Ok(());
    };
    if remote.host.trim().is_empty() {
        return Err(AdbError::Config(
            "[remote].host must not be empty".to_string(),
        ));
    }
    if remote.port == 0 {
        return Err(AdbError::Config("[remote].port must be >= 1 (got 0)".to_string()));
    }
    Ok(())
}

fn validate_execution(cfg: &RawConfigFile) -> Result<()> {
    let exec = &cfg.execution;
    let checks = [
        ("timeout_ms", exec.timeout_ms),
        ("long_timeout_ms", exec.long_timeout_ms),
        ("retries", u64::from(exec.retries)),
        ("retry_wait_ms", exec.retry_wait_ms),
    ];
    for (field, value) in checks {
        if value == 0 {
            return Err(AdbError::Config(format!(
                "[execution].{field} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}

/// Check that the configured adb executable can actually be found.
///
/// Kept separate from `TryFrom` so configs can be validated on machines
/// without adb installed. Bare names are resolved against `PATH`.
pub fn validate_paths(cfg: &ConfigFile) -> Result<()> {
    let path = &cfg.adb.path;
    if path.components().count() > 1 || path.is_absolute() {
        if path.is_file() {
            return Ok(());
        }
        return Err(AdbError::Config(format!(
            "adb executable '{}' does not exist",
            path.display()
        )));
    }

    let found = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(path).is_file()))
        .unwrap_or(false);
    if found {
        Ok(())
    } else {
        Err(AdbError::Config(format!(
            "adb executable '{}' not found on PATH",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ExecutionSection, RemoteSection};

    #[test]
    fn defaults_are_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.execution.retries, 3);
        assert!(cfg.remote.is_none());
    }

    #[test]
    fn remote_host_is_trimmed() {
        let raw = RawConfigFile {
            remote: Some(RemoteSection {
                host: " lab ".to_string(),
                port: 5038,
            }),
            ..RawConfigFile::default()
        };
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.remote, Some(RemoteServer::new("lab", 5038)));
    }

    #[test]
    fn zero_values_are_rejected() {
        for execution in [
            ExecutionSection {
                retries: 0,
                ..ExecutionSection::default()
            },
            ExecutionSection {
                timeout_ms: 0,
                ..ExecutionSection::default()
            },
            ExecutionSection {
                retry_wait_ms: 0,
                ..ExecutionSection::default()
            },
        ] {
            let raw = RawConfigFile {
                execution,
                ..RawConfigFile::default()
            };
            assert!(ConfigFile::try_from(raw).is_err(), "{execution:?}");
        }
    }

    #[test]
    fn blank_remote_host_is_rejected() {
        let raw = RawConfigFile {
            remote: Some(RemoteSection {
                host: "  ".to_string(),
                port: 5037,
            }),
            ..RawConfigFile::default()
        };
        assert!(matches!(ConfigFile::try_from(raw), Err(AdbError::Config(_))));
    }
}
