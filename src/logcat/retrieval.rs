// src/logcat/retrieval.rs

//! Download and reassemble rotated log files.
//!
//! Stages: list the remote files, order them oldest first, pull each into a
//! fresh scratch directory, concatenate into the destination, and remove the
//! scratch directory whatever happened before. A file that fails to pull is
//! logged and left out; it never fails the whole retrieval.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::AdbBackend;
use crate::types::CommandResult;

use super::rotation::{RotationParser, base_name};

const SCRATCH_PREFIX: &str = "adb-runner-logcat-";

/// What to retrieve and where to put it.
#[derive(Debug, Clone, Default)]
pub struct RetrievalRequest {
    /// Device file logcat wrote to; rotated files share it as a prefix.
    pub device_file: String,
    pub device_id: Option<String>,
    /// Combined output file. `None` only collects lines in memory.
    pub destination: Option<PathBuf>,
    /// Parent of the scratch directory; the system temp dir if `None`.
    pub scratch_root: Option<PathBuf>,
}

impl RetrievalRequest {
    pub fn new(device_file: impl Into<String>) -> Self {
        Self {
            device_file: device_file.into(),
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device_id: Option<String>) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }
}

/// Result of a retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrieval {
    /// Remote files that made it into the output, oldest first.
    pub combined: Vec<String>,
    /// Remote files that were listed but could not be pulled.
    pub skipped: Vec<String>,
    /// Non-blank lines of the combined content, in order.
    pub lines: Vec<String>,
    /// The remote listing itself failed (as opposed to matching nothing).
    pub listing_failed: bool,
    /// The destination, if one was requested and written.
    pub artifact: Option<PathBuf>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }
}

/// List, pull and combine every rotated file of `request.device_file`.
///
/// Returns an empty [`Retrieval`] when nothing is found, with
/// `listing_failed` set if the listing command itself failed. Errors are
/// limited to local I/O (scratch directory, destination file).
pub async fn retrieve_rotated(
    backend: &dyn AdbBackend,
    request: &RetrievalRequest,
) -> Result<Retrieval> {
    let device_id = request.device_id.as_deref();
    let parser = RotationParser::new(&request.device_file)?;

    let Some(mut remote_files) = list_rotated_files(backend, &request.device_file, device_id).await
    else {
        return Ok(Retrieval {
            listing_failed: true,
            ..Retrieval::default()
        });
    };
    if remote_files.is_empty() {
        return Ok(Retrieval::default());
    }
    parser.combination_order(&mut remote_files);

    let scratch = create_scratch_dir(request.scratch_root.as_deref())?;
    debug!(dir = %scratch.path().display(), "created scratch directory");

    let outcome = download_and_combine(backend, request, &remote_files, scratch.path()).await;

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(dir = %scratch_path.display(), error = %e, "failed to remove scratch directory");
    }

    outcome
}

async fn list_rotated_files(
    backend: &dyn AdbBackend,
    device_file: &str,
    device_id: Option<&str>,
) -> Option<Vec<String>> {
    let listing = backend.list_remote_files(device_file, device_id).await;
    if !listing.success {
        warn!(
            file = device_file,
            output = ?listing.output,
            "listing log files failed; no files found"
        );
        return None;
    }

    let files: Vec<String> = listing
        .output
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if files.is_empty() {
        warn!(file = device_file, "no log files found");
    }
    Some(files)
}

fn create_scratch_dir(root: Option<&Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    let dir = match root {
        Some(root) => builder.tempdir_in(root)?,
        None => builder.tempdir()?,
    };
    Ok(dir)
}

async fn download_and_combine(
    backend: &dyn AdbBackend,
    request: &RetrievalRequest,
    remote_files: &[String],
    scratch: &Path,
) -> Result<Retrieval> {
    let device_id = request.device_id.as_deref();
    info!(files = ?remote_files, "pulling log files");

    let mut retrieval = Retrieval::default();
    let mut local_files = Vec::with_capacity(remote_files.len());

    for remote in remote_files {
        let local = scratch.join(base_name(remote));
        let result = backend.pull(remote, &local, device_id).await;
        if result.success && fs::try_exists(&local).await.unwrap_or(false) {
            local_files.push(local);
            retrieval.combined.push(remote.clone());
        } else {
            warn!(file = %remote, output = ?result.output, "could not pull log file; skipping");
            retrieval.skipped.push(remote.clone());
        }
    }

    let mut target = match &request.destination {
        Some(destination) => {
            info!(destination = %destination.display(), "combining log files");
            Some(fs::File::create(destination).await?)
        }
        None => None,
    };

    for local in &local_files {
        let bytes = fs::read(local).await?;
        if let Some(target) = target.as_mut() {
            target.write_all(&bytes).await?;
        }
        retrieval.lines.extend(
            String::from_utf8_lossy(&bytes)
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string),
        );
    }

    if let Some(mut target) = target {
        target.flush().await?;
        retrieval.artifact = request.destination.clone();
    }

    Ok(retrieval)
}

/// Pull a single (non-rotated) device file straight into `destination`.
pub async fn retrieve_single(
    backend: &dyn AdbBackend,
    device_file: &str,
    destination: &Path,
    device_id: Option<&str>,
) -> CommandResult {
    info!(file = device_file, destination = %destination.display(), "pulling log file");
    backend.pull(device_file, destination, device_id).await
}
