// src/logcat/background.rs

//! A logcat capture left running on the device until explicitly collected.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::commands::{LogcatCommandBuilder, device};
use crate::errors::Result;
use crate::exec::{AdbBackend, ProcessHandle};
use crate::types::CommandResult;

use super::retrieval::{self, Retrieval, RetrievalRequest};

/// A running `adb logcat -f <device file>` capture.
#[derive(Debug, Clone)]
pub struct BackgroundLogcat {
    process: Arc<ProcessHandle>,
    device_id: Option<String>,
    device_file: String,
    rotate_files: bool,
    start_time: SystemTime,
}

impl BackgroundLogcat {
    pub fn new(
        process: Arc<ProcessHandle>,
        device_id: Option<String>,
        device_file: impl Into<String>,
        rotate_files: bool,
    ) -> Self {
        Self {
            process,
            device_id,
            device_file: device_file.into(),
            rotate_files,
            start_time: SystemTime::now(),
        }
    }

    /// Launch `builder` in the background.
    ///
    /// When rotating, rotated files left over from an earlier capture are
    /// deleted first so they don't end up in the next retrieval.
    pub async fn start(
        backend: &dyn AdbBackend,
        builder: &LogcatCommandBuilder,
        device_id: Option<String>,
        device_file: impl Into<String>,
        rotate_files: bool,
    ) -> Result<Self> {
        let device_file = device_file.into();
        if rotate_files {
            debug!(file = %device_file, "deleting existing rotated log files");
            let result = backend
                .delete_remote_files(&device_file, device_id.as_deref())
                .await;
            result.log_output();
        }

        let args = builder.clone().with_dump_and_exit(false).build();
        let process = backend.execute_background(args, device_id.as_deref())?;
        info!(file = %device_file, rotate_files, "background logcat started");
        Ok(Self::new(process, device_id, device_file, rotate_files))
    }

    pub fn process(&self) -> &Arc<ProcessHandle> {
        &self.process
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn device_file(&self) -> &str {
        &self.device_file
    }

    pub fn rotate_files(&self) -> bool {
        self.rotate_files
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Stop the capture. A capture that already stopped is reported by the
    /// process handle, not treated as an error.
    pub async fn terminate(&self) -> CommandResult {
        self.process.terminate().await
    }

    /// Pull the captured log into `destination`: every rotated file combined
    /// oldest first, or the single device file.
    pub async fn retrieve(
        &self,
        backend: &dyn AdbBackend,
        destination: &Path,
        scratch_root: Option<&Path>,
    ) -> Result<Retrieval> {
        if !self.rotate_files {
            let result = retrieval::retrieve_single(
                backend,
                &self.device_file,
                destination,
                self.device_id(),
            )
            .await;
            if !result.success {
                warn!(file = %self.device_file, "could not pull log file");
                result.log_output();
                return Ok(Retrieval {
                    skipped: vec![self.device_file.clone()],
                    ..Retrieval::default()
                });
            }
            let bytes = tokio::fs::read(destination).await?;
            let lines = String::from_utf8_lossy(&bytes)
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect();
            return Ok(Retrieval {
                combined: vec![self.device_file.clone()],
                skipped: Vec::new(),
                lines,
                artifact: Some(destination.to_path_buf()),
                listing_failed: false,
            });
        }

        let mut request = RetrievalRequest::new(self.device_file.clone())
            .with_device(self.device_id.clone())
            .with_destination(destination);
        if let Some(root) = scratch_root {
            request = request.with_scratch_root(root);
        }
        retrieval::retrieve_rotated(backend, &request).await
    }

    /// Remove the capture's files from the device (one attempt).
    pub async fn delete_device_files(&self, backend: &dyn AdbBackend) -> CommandResult {
        debug!(file = %self.device_file, rotate_files = self.rotate_files, "deleting log files");
        let result = if self.rotate_files {
            backend
                .delete_remote_files(&self.device_file, self.device_id())
                .await
        } else {
            backend
                .execute(
                    device::delete_file(&self.device_file),
                    self.device_id(),
                    backend.default_options().once(),
                )
                .await
        };
        result.log_output();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::AdbArgs;

    #[tokio::test]
    async fn terminate_reports_the_handle_result() {
        let process = ProcessHandle::new("adb", AdbArgs::from(["logcat"]));
        let capture = BackgroundLogcat::new(Arc::clone(&process), None, "/sdcard/x.log", false);

        let first = capture.terminate().await;
        let second = capture.terminate().await;

        assert_eq!(first, second);
        assert_eq!(process.result(), Some(first));
    }
}
