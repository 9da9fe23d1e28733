#![allow(dead_code, unused_imports)]

use std::path::{Path, PathBuf};

pub use adb_runner_test_utils::{FakeAdb, init_tracing, with_timeout};

/// Write an executable `sh` script standing in for the adb binary.
#[cfg(unix)]
pub fn fake_adb_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("adb");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod script");
    path
}

/// Fast retry policy for tests.
pub fn quick_options(retries: u32) -> adb_runner::types::ExecOptions {
    adb_runner::types::ExecOptions::new(
        std::time::Duration::from_secs(5),
        retries,
        std::time::Duration::from_millis(10),
    )
}
