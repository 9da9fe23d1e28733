// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::{InstallFlag, InstallOptions, LogcatBuffer, LogcatFormat};

/// Command-line arguments for `adb-runner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "adb-runner",
    version,
    about = "Run adb commands with timeouts, retries and managed logcat capture.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `AdbRunner.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ADB_RUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Target device serial. Optional when a single device is connected.
    #[arg(long, short = 's', value_name = "ID", global = true)]
    pub device: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Run adb with arbitrary arguments.
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Copy a local file to the device.
    Push { local: PathBuf, remote: String },
    /// Copy a device file to the host.
    Pull { remote: String, local: PathBuf },
    /// Install an APK.
    Install(InstallArgs),
    /// Remove a package.
    Uninstall { package: String },
    Reboot,
    /// Switch airplane mode on or off.
    Airplane {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Dump the state of a system service.
    Dumpsys { service: String },
    /// Launch a package's main activity.
    StartApp { package: String },
    /// Empty the device log buffers.
    ClearLogcat,
    /// Dump logcat, or capture it in the background until Ctrl-C.
    Logcat(LogcatArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
    pub apk: PathBuf,
    /// Replace an existing application (-r).
    #[arg(long)]
    pub replace: bool,
    /// Allow version code downgrade (-d).
    #[arg(long)]
    pub downgrade: bool,
    /// Allow test packages (-t).
    #[arg(long)]
    pub allow_test: bool,
    /// Grant all runtime permissions (-g).
    #[arg(long)]
    pub grant_permissions: bool,
    /// Install on the SD card (-s).
    #[arg(long)]
    pub sd_card: bool,
    /// Forward-lock the application (-l).
    #[arg(long)]
    pub forward_lock: bool,
}

impl InstallArgs {
    pub fn options(&self) -> InstallOptions {
        [
            (self.forward_lock, InstallFlag::ForwardLock),
            (self.replace, InstallFlag::Replace),
            (self.allow_test, InstallFlag::AllowTestPackages),
            (self.sd_card, InstallFlag::SdCard),
            (self.downgrade, InstallFlag::AllowDowngrade),
            (self.grant_permissions, InstallFlag::GrantPermissions),
        ]
        .into_iter()
        .filter_map(|(set, flag)| set.then_some(flag))
        .collect()
    }
}

#[derive(Debug, Clone, Args)]
pub struct LogcatArgs {
    /// Local file for the log. Required with `--continuous`.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Keep logging on the device until Ctrl-C, then collect the file(s).
    #[arg(long)]
    pub continuous: bool,

    /// Device file logcat writes to in continuous mode.
    #[arg(long, value_name = "PATH", default_value = "$EXTERNAL_STORAGE/triangle.log")]
    pub device_file: String,

    /// Rotate the device file.
    #[arg(long)]
    pub rotate: bool,

    /// Rotated file size in Kb.
    #[arg(long, value_name = "KB", default_value_t = 16)]
    pub rotate_size: u32,

    /// Number of rotated files to keep.
    #[arg(long, value_name = "N", default_value_t = 4)]
    pub rotate_count: u32,

    /// Delete the device file(s) after collecting them.
    #[arg(long)]
    pub delete: bool,

    /// Buffers to read (radio, events, main, system, crash).
    #[arg(long = "buffer", short = 'b', value_name = "NAME")]
    pub buffers: Vec<LogcatBuffer>,

    /// Output format (brief, long, process, raw, tag, thread, threadtime, time).
    #[arg(long, value_name = "FORMAT", default_value = "threadtime")]
    pub format: LogcatFormat,

    /// Filter specs such as `ActivityManager:I`; `*:S` silences the rest.
    #[arg(long = "filter", value_name = "TAG:PRIORITY")]
    pub filters: Vec<String>,

    /// Directory in which to create the scratch directory for rotated files.
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_keeps_hyphenated_arguments() {
        let args = CliArgs::try_parse_from(["adb-runner", "-s", "emu", "exec", "shell", "ls", "-l"])
            .unwrap();
        assert_eq!(args.device.as_deref(), Some("emu"));
        match args.command {
            CliCommand::Exec { args } => assert_eq!(args, ["shell", "ls", "-l"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn install_flags_map_to_options() {
        let args =
            CliArgs::try_parse_from(["adb-runner", "install", "app.apk", "--replace", "--downgrade"])
                .unwrap();
        let CliCommand::Install(install) = args.command else {
            panic!("expected install");
        };
        assert_eq!(install.options().to_flags(), ["-r", "-d"]);
    }

    #[test]
    fn logcat_parses_buffers_and_format() {
        let args = CliArgs::try_parse_from([
            "adb-runner", "logcat", "-b", "radio", "-b", "main", "--format", "time",
        ])
        .unwrap();
        let CliCommand::Logcat(logcat) = args.command else {
            panic!("expected logcat");
        };
        assert_eq!(logcat.buffers, [LogcatBuffer::Radio, LogcatBuffer::Main]);
        assert_eq!(logcat.format, LogcatFormat::Time);
        assert!(!logcat.continuous);
    }

    #[test]
    fn unknown_buffer_is_rejected() {
        assert!(CliArgs::try_parse_from(["adb-runner", "logcat", "-b", "kernel"]).is_err());
    }
}
