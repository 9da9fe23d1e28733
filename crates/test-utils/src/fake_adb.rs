use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use adb_runner::errors::Result;
use adb_runner::exec::{AdbArgs, AdbBackend, BoxFuture, ProcessHandle};
use adb_runner::types::{CommandResult, ExecOptions};

/// One command seen by [`FakeAdb`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub args: AdbArgs,
    pub device_id: Option<String>,
    /// `None` for background launches.
    pub options: Option<ExecOptions>,
}

impl RecordedCall {
    pub fn is_background(&self) -> bool {
        self.options.is_none()
    }
}

/// An [`AdbBackend`] that never spawns anything.
///
/// - records every command, in order
/// - serves `shell ls <prefix>*`, `shell rm -f ...`, `pull` and `push` from a
///   local directory standing in for the device file system
///   (`/sdcard/a.log` lives at `<device_root>/sdcard/a.log`)
/// - answers anything else with a scripted result, or success with no output
/// - background launches return handles that were never started
pub struct FakeAdb {
    device_root: PathBuf,
    calls: Mutex<Vec<RecordedCall>>,
    scripted: Mutex<HashMap<Vec<String>, CommandResult>>,
    failing_pulls: Mutex<BTreeSet<String>>,
    listing_fails: AtomicBool,
    background: Mutex<Vec<Arc<ProcessHandle>>>,
}

impl FakeAdb {
    pub fn new(device_root: impl Into<PathBuf>) -> Self {
        Self {
            device_root: device_root.into(),
            calls: Mutex::new(Vec::new()),
            scripted: Mutex::new(HashMap::new()),
            failing_pulls: Mutex::new(BTreeSet::new()),
            listing_fails: AtomicBool::new(false),
            background: Mutex::new(Vec::new()),
        }
    }

    /// Local path backing a remote path.
    pub fn device_path(&self, remote: &str) -> PathBuf {
        self.device_root.join(remote.trim_start_matches('/'))
    }

    pub fn put_device_file(&self, remote: &str, contents: impl AsRef<[u8]>) {
        let path = self.device_path(remote);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fake device dir");
        }
        fs::write(&path, contents).expect("write fake device file");
    }

    pub fn device_file_exists(&self, remote: &str) -> bool {
        self.device_path(remote).exists()
    }

    /// Make every pull of `remote` fail.
    pub fn fail_pull(&self, remote: &str) {
        self.failing_pulls.lock().insert(remote.to_string());
    }

    /// Make every `shell ls` fail.
    pub fn fail_listing(&self) {
        self.listing_fails.store(true, Ordering::SeqCst);
    }

    /// Answer the exact argument vector `args` with `result`.
    pub fn respond(&self, args: &[&str], result: CommandResult) {
        let key = args.iter().map(|a| a.to_string()).collect();
        self.scripted.lock().insert(key, result);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Every recorded command as a space-joined line.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.args.to_string()).collect()
    }

    pub fn background_handles(&self) -> Vec<Arc<ProcessHandle>> {
        self.background.lock().clone()
    }

    fn respond_to(&self, args: &AdbArgs) -> CommandResult {
        if let Some(result) = self.scripted.lock().get(args.as_slice()) {
            return result.clone();
        }

        let parts: Vec<&str> = args.iter().collect();
        match parts.as_slice() {
            ["shell", cmd] if cmd.starts_with("ls ") => {
                self.list(cmd.trim_start_matches("ls ").trim_end_matches('*'))
            }
            ["shell", cmd] if cmd.starts_with("rm -f ") => {
                let target = cmd.trim_start_matches("rm -f ");
                match target.strip_suffix('*') {
                    Some(prefix) => self.remove_matching(prefix),
                    None => {
                        let _ = fs::remove_file(self.device_path(target));
                        CommandResult::success(Vec::new())
                    }
                }
            }
            ["pull", remote, local] => self.pull(remote, Path::new(local)),
            ["push", local, remote] => self.push(Path::new(local), remote),
            _ => CommandResult::success(Vec::new()),
        }
    }

    fn matching(&self, prefix: &str) -> Vec<(String, PathBuf)> {
        let (dir, base) = match prefix.rsplit_once('/') {
            Some((dir, base)) => (dir.to_string(), base),
            None => (String::new(), prefix),
        };
        let Ok(entries) = fs::read_dir(self.device_path(&dir)) else {
            return Vec::new();
        };

        let mut found: Vec<(String, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.starts_with(base)
                    .then(|| (format!("{dir}/{name}"), entry.path()))
            })
            .collect();
        found.sort();
        found
    }

    fn list(&self, prefix: &str) -> CommandResult {
        if self.listing_fails.load(Ordering::SeqCst) {
            return CommandResult::failure(vec!["ls: permission denied".to_string()]);
        }
        let found = self.matching(prefix);
        if found.is_empty() {
            return CommandResult::failure(vec![format!("ls: {prefix}*: No such file or directory")]);
        }
        CommandResult::success(found.into_iter().map(|(remote, _)| remote).collect())
    }

    fn remove_matching(&self, prefix: &str) -> CommandResult {
        for (_, path) in self.matching(prefix) {
            let _ = fs::remove_file(path);
        }
        CommandResult::success(Vec::new())
    }

    fn pull(&self, remote: &str, local: &Path) -> CommandResult {
        if self.failing_pulls.lock().contains(remote) {
            return CommandResult::failure(vec![format!("adb: error: failed to pull '{remote}'")]);
        }
        match fs::copy(self.device_path(remote), local) {
            Ok(bytes) => CommandResult::success(vec![format!("{remote}: 1 file pulled, {bytes} bytes")]),
            Err(e) => CommandResult::failure(vec![format!("adb: error: {remote}: {e}")]),
        }
    }

    fn push(&self, local: &Path, remote: &str) -> CommandResult {
        let target = self.device_path(remote);
        if let Some(parent) = target.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match fs::copy(local, target) {
            Ok(_) => CommandResult::success(vec![format!("{}: 1 file pushed", local.display())]),
            Err(e) => CommandResult::failure(vec![format!("adb: error: {e}")]),
        }
    }
}

impl AdbBackend for FakeAdb {
    fn execute<'a>(
        &'a self,
        args: AdbArgs,
        device_id: Option<&'a str>,
        options: ExecOptions,
    ) -> BoxFuture<'a, CommandResult> {
        Box::pin(async move {
            self.calls.lock().push(RecordedCall {
                args: args.clone(),
                device_id: device_id.map(str::to_string),
                options: Some(options),
            });
            self.respond_to(&args)
        })
    }

    fn execute_background(
        &self,
        args: AdbArgs,
        device_id: Option<&str>,
    ) -> Result<Arc<ProcessHandle>> {
        self.calls.lock().push(RecordedCall {
            args: args.clone(),
            device_id: device_id.map(str::to_string),
            options: None,
        });
        let handle = ProcessHandle::new("adb", args);
        self.background.lock().push(Arc::clone(&handle));
        Ok(handle)
    }

    fn default_options(&self) -> ExecOptions {
        ExecOptions::default()
    }

    fn long_options(&self) -> ExecOptions {
        ExecOptions::default().with_timeout(ExecOptions::LONG_TIMEOUT)
    }
}
