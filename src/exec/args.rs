// src/exec/args.rs

//! Argument vectors passed to the adb executable.

use std::fmt;

/// An ordered list of arguments for one adb invocation.
///
/// Arguments are kept as separate strings (no shell re-parsing on the host
/// side); `Display` joins them with spaces for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdbArgs(Vec<String>);

impl AdbArgs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.0.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }

    pub fn extend(&mut self, other: AdbArgs) {
        self.0.extend(other.0);
    }

    /// Split a free-form argument line on whitespace.
    ///
    /// No quoting rules apply; callers that need an argument containing
    /// spaces should build `AdbArgs` directly.
    pub fn from_line(line: &str) -> Self {
        Self(line.split_whitespace().map(str::to_string).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for AdbArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl<S: Into<String>> FromIterator<S> for AdbArgs {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for AdbArgs {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

impl From<&[&str]> for AdbArgs {
    fn from(args: &[&str]) -> Self {
        args.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for AdbArgs {
    fn from(args: [&str; N]) -> Self {
        args.into_iter().collect()
    }
}

/// Connection to a remote adb server (`-H <host> -P <port>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServer {
    pub host: String,
    pub port: u16,
}

impl RemoteServer {
    pub const DEFAULT_PORT: u16 = 5037;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Build the full argument vector for one invocation:
/// `[-H <host> -P <port>] [-s <device>] <args>`.
///
/// A blank device id never emits a device selector.
pub fn assemble(remote: Option<&RemoteServer>, device_id: Option<&str>, args: AdbArgs) -> AdbArgs {
    let mut full = AdbArgs::new();

    if let Some(remote) = remote {
        full.push("-H");
        full.push(remote.host.clone());
        full.push("-P");
        full.push(remote.port.to_string());
    }

    if let Some(id) = device_id.map(str::trim).filter(|id| !id.is_empty()) {
        full.push("-s");
        full.push(id);
    }

    full.extend(args);
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_arguments_pass_through() {
        let args = assemble(None, None, AdbArgs::from(["devices"]));
        assert_eq!(args.to_string(), "devices");
    }

    #[test]
    fn blank_device_id_emits_no_selector() {
        for id in ["", "   ", "\t"] {
            let args = assemble(None, Some(id), AdbArgs::from(["reboot"]));
            assert_eq!(args.as_slice(), ["reboot"], "device id {id:?}");
        }
    }

    #[test]
    fn device_id_is_trimmed_and_prepended() {
        let args = assemble(None, Some(" emulator-5554 "), AdbArgs::from(["reboot"]));
        assert_eq!(args.as_slice(), ["-s", "emulator-5554", "reboot"]);
    }

    #[test]
    fn remote_flags_come_before_device_selector() {
        let remote = RemoteServer::new("10.0.0.5", 5038);
        let args = assemble(Some(&remote), Some("abc"), AdbArgs::from(["logcat", "-d"]));
        assert_eq!(
            args.to_string(),
            "-H 10.0.0.5 -P 5038 -s abc logcat -d"
        );
    }

    #[test]
    fn from_line_splits_on_whitespace() {
        let args = AdbArgs::from_line("  shell   ls  /sdcard ");
        assert_eq!(args.as_slice(), ["shell", "ls", "/sdcard"]);
    }
}
