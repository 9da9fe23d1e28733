// src/commands/device.rs

//! Argument vectors for one-shot device actions.

use std::path::Path;

use crate::commands::install::InstallOptions;
use crate::exec::AdbArgs;

pub fn push(local: &Path, remote: &str) -> AdbArgs {
    AdbArgs::new()
        .arg("push")
        .arg(local.to_string_lossy())
        .arg(remote)
}

pub fn pull(remote: &str, local: &Path) -> AdbArgs {
    AdbArgs::new()
        .arg("pull")
        .arg(remote)
        .arg(local.to_string_lossy())
}

pub fn install(apk: &Path, options: &InstallOptions) -> AdbArgs {
    AdbArgs::new()
        .arg("install")
        .args(options.to_flags())
        .arg(apk.to_string_lossy())
}

pub fn uninstall(package: &str) -> AdbArgs {
    AdbArgs::from(["uninstall", package])
}

pub fn reboot() -> AdbArgs {
    AdbArgs::from(["reboot"])
}

/// First half of toggling airplane mode: persist the setting.
pub fn airplane_mode_setting(enable: bool) -> AdbArgs {
    let value = if enable { "1" } else { "0" };
    AdbArgs::from(["shell", "settings", "put", "global", "airplane_mode_on", value])
}

/// Second half: tell the system the setting changed.
pub fn airplane_mode_broadcast(enable: bool) -> AdbArgs {
    AdbArgs::from([
        "shell",
        "am",
        "broadcast",
        "-a",
        "android.intent.action.AIRPLANE_MODE",
        "--ez",
        "state",
        if enable { "true" } else { "false" },
    ])
}

pub fn dumpsys(service: &str) -> AdbArgs {
    AdbArgs::from(["shell", "dumpsys", service])
}

/// Launch a package's main activity through `monkey`.
pub fn start_app(package: &str) -> AdbArgs {
    AdbArgs::from([
        "shell",
        "monkey",
        "-p",
        package,
        "-c",
        "android.intent.category.LAUNCHER",
        "1",
    ])
}

/// `ls <prefix>*`, expanded by the device shell.
///
/// The shell command travels as a single argument so the glob reaches the
/// device unexpanded.
pub fn list_files(prefix: &str) -> AdbArgs {
    AdbArgs::new().arg("shell").arg(format!("ls {prefix}*"))
}

/// `rm -f <prefix>*`, expanded by the device shell.
pub fn delete_files(prefix: &str) -> AdbArgs {
    AdbArgs::new().arg("shell").arg(format!("rm -f {prefix}*"))
}

/// `rm -f <path>` for exactly one file.
pub fn delete_file(path: &str) -> AdbArgs {
    AdbArgs::new().arg("shell").arg(format!("rm -f {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::install::InstallFlag;

    #[test]
    fn transfers_keep_paths_as_single_arguments() {
        let args = push(Path::new("/tmp/my file.apk"), "/sdcard/my file.apk");
        assert_eq!(args.as_slice(), ["push", "/tmp/my file.apk", "/sdcard/my file.apk"]);

        let args = pull("/sdcard/log.txt", Path::new("out/log.txt"));
        assert_eq!(args.as_slice(), ["pull", "/sdcard/log.txt", "out/log.txt"]);
    }

    #[test]
    fn install_places_flags_before_the_apk() {
        let options = InstallOptions::new()
            .with(InstallFlag::AllowDowngrade)
            .with(InstallFlag::Replace);
        let args = install(Path::new("app.apk"), &options);
        assert_eq!(args.to_string(), "install -r -d app.apk");
    }

    #[test]
    fn airplane_mode_commands() {
        assert_eq!(
            airplane_mode_setting(true).to_string(),
            "shell settings put global airplane_mode_on 1"
        );
        assert_eq!(
            airplane_mode_broadcast(false).to_string(),
            "shell am broadcast -a android.intent.action.AIRPLANE_MODE --ez state false"
        );
    }

    #[test]
    fn remote_globs_stay_in_one_shell_argument() {
        assert_eq!(list_files("/sdcard/app.log").as_slice(), ["shell", "ls /sdcard/app.log*"]);
        assert_eq!(
            delete_files("/sdcard/app.log").as_slice(),
            ["shell", "rm -f /sdcard/app.log*"]
        );
    }

    #[test]
    fn start_app_uses_monkey_launcher() {
        assert_eq!(
            start_app("com.example").to_string(),
            "shell monkey -p com.example -c android.intent.category.LAUNCHER 1"
        );
    }
}
