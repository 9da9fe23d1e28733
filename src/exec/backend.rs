// src/exec/backend.rs

//! Pluggable adb backend abstraction.
//!
//! Everything above the executor (the rotated-log pipeline, the background
//! logcat workflow, the steps) talks to an `AdbBackend` instead of a concrete
//! [`AdbExecutor`](super::AdbExecutor). Tests swap in a fake device that
//! serves listings and pulls from a local directory.
//!
//! Implementors provide raw foreground/background execution plus their
//! timing defaults; the device actions are provided on top of those.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::commands::device;
use crate::commands::install::InstallOptions;
use crate::errors::Result;
use crate::types::{CommandResult, ExecOptions};

use super::args::AdbArgs;
use super::process::ProcessHandle;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait AdbBackend: Send + Sync {
    /// Run a command to completion with the given timeout/retry policy.
    fn execute<'a>(
        &'a self,
        args: AdbArgs,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult>;

    /// Launch a command that keeps running until terminated.
    fn execute_background(
        &self,
        args: AdbArgs,
        device_id: Option<&str>,
    ) -> Result<Arc<ProcessHandle>>;

    /// Policy for short commands.
    fn default_options(&self) -> ExecOptions;

    /// Policy for transfers and package management.
    fn long_options(&self) -> ExecOptions;

    fn push<'a>(
        &'a self,
        local: &'a Path,
        remote: &'a str,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.push_with(local, remote, device_id, self.long_options())
    }

    fn push_with<'a>(
        &'a self,
        local: &'a Path,
        remote: &'a str,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::push(local, remote), device_id, options)
    }

    fn pull<'a>(
        &'a self,
        remote: &'a str,
        local: &'a Path,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.pull_with(remote, local, device_id, self.long_options())
    }

    fn pull_with<'a>(
        &'a self,
        remote: &'a str,
        local: &'a Path,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::pull(remote, local), device_id, options)
    }

    fn install<'a>(
        &'a self,
        apk: &'a Path,
        install_options: &'a InstallOptions,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.install_with(apk, install_options, device_id, self.long_options())
    }

    fn install_with<'a>(
        &'a self,
        apk: &'a Path,
        install_options: &'a InstallOptions,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::install(apk, install_options), device_id, options)
    }

    fn uninstall<'a>(
        &'a self,
        package: &'a str,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.uninstall_with(package, device_id, self.long_options())
    }

    fn uninstall_with<'a>(
        &'a self,
        package: &'a str,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::uninstall(package), device_id, options)
    }

    fn reboot<'a>(&'a self, device_id: Option<&'a str>) -> BoxFuture<'a, CommandResult> {
        self.reboot_with(device_id, self.default_options())
    }

    fn reboot_with<'a>(
        &'a self,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::reboot(), device_id, options)
    }

    fn set_airplane_mode<'a>(
        &'a self,
        enable: bool,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.set_airplane_mode_with(enable, device_id, self.long_options())
    }

    /// Two commands: persist the setting, then broadcast the change. `options`
    /// applies to each command separately. If the first fails its result is
    /// returned as is; otherwise the broadcast result is returned with the
    /// setting's output (and an empty separator line) in front.
    fn set_airplane_mode_with<'a>(
        &'a self,
        enable: bool,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        Box::pin(async move {
            let setting = self
                .execute(device::airplane_mode_setting(enable), device_id, options)
                .await;
            if !setting.success {
                return setting;
            }

            let broadcast = self
                .execute(device::airplane_mode_broadcast(enable), device_id, options)
                .await;

            let mut output = setting.output;
            output.push(String::new());
            output.extend(broadcast.output);
            CommandResult::new(broadcast.success, output)
        })
    }

    fn dumpsys<'a>(
        &'a self,
        service: &'a str,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.dumpsys_with(service, device_id, self.default_options())
    }

    fn dumpsys_with<'a>(
        &'a self,
        service: &'a str,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::dumpsys(service), device_id, options)
    }

    fn start_app<'a>(
        &'a self,
        package: &'a str,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.start_app_with(package, device_id, self.default_options())
    }

    fn start_app_with<'a>(
        &'a self,
        package: &'a str,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::start_app(package), device_id, options)
    }

    /// `ls <prefix>*` on the device; one file per output line.
    fn list_remote_files<'a>(
        &'a self,
        prefix: &'a str,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.list_remote_files_with(prefix, device_id, self.default_options())
    }

    fn list_remote_files_with<'a>(
        &'a self,
        prefix: &'a str,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::list_files(prefix), device_id, options)
    }

    /// `rm -f <prefix>*` on the device, attempted exactly once.
    fn delete_remote_files<'a>(
        &'a self,
        prefix: &'a str,
        device_id: Option<&'a str>,
    ) -> BoxFuture<'a, CommandResult> {
        self.delete_remote_files_with(prefix, device_id, self.default_options())
    }

    fn delete_remote_files_with<'a>(
        &'a self,
        prefix: &'a str,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        self.execute(device::delete_files(prefix), device_id, options.once())
    }
}
