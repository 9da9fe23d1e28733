// src/steps/command.rs

use std::path::PathBuf;

use tracing::info;

use crate::commands::{InstallFlag, InstallOptions};
use crate::errors::Result;
use crate::exec::{AdbArgs, AdbBackend, BoxFuture};
use crate::types::CommandResult;

use super::{CommandSettings, Step, ValidationError, Verdict, handle_result, is_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdbCommand {
    /// Free-form arguments.
    #[default]
    Custom,
    Push,
    Pull,
    Install,
    Uninstall,
    Reboot,
    StartApp,
}

/// Runs one adb command and passes when it succeeds.
#[derive(Debug, Clone)]
pub struct AdbCommandStep {
    pub command: AdbCommand,
    pub device_id: Option<String>,
    /// Whitespace-separated arguments for [`AdbCommand::Custom`].
    pub arguments: String,
    pub local_file: Option<PathBuf>,
    pub remote_file: String,
    pub install_options: InstallOptions,
    pub package: String,
    pub settings: CommandSettings,
}

impl Default for AdbCommandStep {
    fn default() -> Self {
        Self {
            command: AdbCommand::Custom,
            device_id: None,
            arguments: "devices".to_string(),
            local_file: None,
            remote_file: String::new(),
            install_options: InstallOptions::new()
                .with(InstallFlag::Replace)
                .with(InstallFlag::AllowDowngrade),
            package: String::new(),
            settings: CommandSettings::default(),
        }
    }
}

impl AdbCommandStep {
    pub fn new(command: AdbCommand) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }

    fn local_file_set(&self) -> bool {
        self.local_file
            .as_ref()
            .is_some_and(|p| !is_blank(&p.to_string_lossy()))
    }

    async fn execute(&self, backend: &dyn AdbBackend) -> CommandResult {
        let device = self.device_id.as_deref();
        let options = self.settings.options();
        let local = self.local_file.clone().unwrap_or_default();

        match self.command {
            AdbCommand::Custom => {
                backend
                    .execute(AdbArgs::from_line(&self.arguments), device, options)
                    .await
            }
            AdbCommand::Push => {
                backend
                    .push_with(&local, &self.remote_file, device, options)
                    .await
            }
            AdbCommand::Pull => {
                backend
                    .pull_with(&self.remote_file, &local, device, options)
                    .await
            }
            AdbCommand::Install => {
                backend
                    .install_with(&local, &self.install_options, device, options)
                    .await
            }
            AdbCommand::Uninstall => backend.uninstall_with(&self.package, device, options).await,
            AdbCommand::Reboot => backend.reboot_with(device, options).await,
            AdbCommand::StartApp => backend.start_app_with(&self.package, device, options).await,
        }
    }
}

impl Step for AdbCommandStep {
    fn name(&self) -> &'static str {
        "adb command"
    }

    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let command = self.command;

        if command == AdbCommand::Custom && is_blank(&self.arguments) {
            errors.push(ValidationError::new(
                "arguments",
                "adb requires at least one argument",
            ));
        }
        if matches!(command, AdbCommand::Push | AdbCommand::Pull | AdbCommand::Install)
            && !self.local_file_set()
        {
            errors.push(ValidationError::new("local_file", "please set a valid local file"));
        }
        if matches!(command, AdbCommand::Push | AdbCommand::Pull) && is_blank(&self.remote_file) {
            errors.push(ValidationError::new("remote_file", "please set a valid remote file"));
        }
        if matches!(command, AdbCommand::Uninstall | AdbCommand::StartApp)
            && is_blank(&self.package)
        {
            errors.push(ValidationError::new("package", "please set a package name"));
        }

        self.settings.validate(&mut errors);
        errors
    }

    fn run<'a>(&'a mut self, backend: &'a dyn AdbBackend) -> BoxFuture<'a, Result<Verdict>> {
        Box::pin(async move {
            info!(command = ?self.command, device = ?self.device_id, "running adb command step");
            let result = self.execute(backend).await;
            let mut verdict = Verdict::NotSet;
            handle_result(&mut verdict, &result);
            Ok(verdict)
        })
    }
}
