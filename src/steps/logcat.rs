// src/steps/logcat.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::commands::{
    LogcatBuffer, LogcatCommandBuilder, LogcatFilter, LogcatFormat, LogcatPriority,
};
use crate::errors::Result;
use crate::exec::{AdbBackend, BoxFuture};
use crate::logcat::BackgroundLogcat;

use super::{Step, ValidationError, Verdict, handle_result, is_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogcatExecutionMode {
    /// Dump the buffers and exit.
    #[default]
    Instant,
    /// Keep logging to a device file until collected by
    /// [`RetrieveBackgroundLogcatStep`].
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogcatOutputMode {
    /// Into this process's log.
    #[default]
    Log,
    LocalFile,
    DeviceFile,
}

/// One `tag:priority` entry of a logcat filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPair {
    pub tag: String,
    pub priority: LogcatPriority,
}

impl FilterPair {
    pub fn new(tag: impl Into<String>, priority: LogcatPriority) -> Self {
        Self {
            tag: tag.into(),
            priority,
        }
    }
}

/// Captures logcat output, either once or in the background.
#[derive(Debug, Clone)]
pub struct LogcatStep {
    pub device_id: Option<String>,
    pub filter_pairs: Vec<FilterPair>,
    /// Priority for tags without their own entry (`*:P`); `None` leaves
    /// logcat's default.
    pub default_filter_priority: Option<LogcatPriority>,
    pub buffers: BTreeSet<LogcatBuffer>,
    pub execution_mode: LogcatExecutionMode,
    pub format: LogcatFormat,
    /// Only used by [`LogcatExecutionMode::Instant`].
    pub output_mode: LogcatOutputMode,
    pub local_file: Option<PathBuf>,
    pub device_file: String,
    pub rotate_files: bool,
    pub rotate_kbytes: u32,
    pub rotate_count: u32,
    /// Set by a continuous run.
    pub background: Option<BackgroundLogcat>,
}

impl Default for LogcatStep {
    fn default() -> Self {
        Self {
            device_id: None,
            filter_pairs: Vec::new(),
            default_filter_priority: None,
            buffers: LogcatBuffer::DEFAULT.into_iter().collect(),
            execution_mode: LogcatExecutionMode::Instant,
            format: LogcatFormat::Threadtime,
            output_mode: LogcatOutputMode::Log,
            local_file: None,
            device_file: "$EXTERNAL_STORAGE/triangle.log".to_string(),
            rotate_files: false,
            rotate_kbytes: 16,
            rotate_count: 4,
            background: None,
        }
    }
}

impl LogcatStep {
    pub fn saves_to_device(&self) -> bool {
        self.execution_mode == LogcatExecutionMode::Continuous
            || self.output_mode == LogcatOutputMode::DeviceFile
    }

    pub fn saves_to_local(&self) -> bool {
        self.execution_mode == LogcatExecutionMode::Instant
            && self.output_mode == LogcatOutputMode::LocalFile
    }

    /// Drop filter pairs with blank tags and later duplicates of a tag.
    pub fn clean_filter_pairs(&mut self) -> usize {
        let before = self.filter_pairs.len();
        let mut seen = Vec::with_capacity(before);
        self.filter_pairs.retain(|pair| {
            if is_blank(&pair.tag) || seen.contains(&pair.tag) {
                return false;
            }
            seen.push(pair.tag.clone());
            true
        });
        let removed = before - self.filter_pairs.len();
        if removed != 0 {
            info!(removed, "removing duplicated or empty filters");
        }
        removed
    }

    pub fn build_filter(&self) -> Result<LogcatFilter> {
        let mut filter = LogcatFilter::new();
        for pair in &self.filter_pairs {
            filter.set_tag_priority(&pair.tag, pair.priority)?;
        }
        if let Some(priority) = self.default_filter_priority {
            filter.set_default_priority(Some(priority));
        }
        Ok(filter)
    }

    pub fn build_command(&self) -> Result<LogcatCommandBuilder> {
        let mut builder = LogcatCommandBuilder::new()
            .with_filter(self.build_filter()?)
            .with_buffers(self.buffers.iter().copied())
            .with_format(self.format);

        if self.saves_to_device() {
            builder = builder.with_file_name(self.device_file.clone());
            if self.rotate_files {
                builder = builder
                    .with_rotate_kbytes(self.rotate_kbytes)
                    .with_rotate_count(self.rotate_count);
            }
            if self.execution_mode == LogcatExecutionMode::Continuous {
                builder = builder.with_dump_and_exit(false);
            }
        }
        Ok(builder)
    }

    async fn run_instant(&self, backend: &dyn AdbBackend) -> Result<Verdict> {
        let device = self.device_id.as_deref();

        if self.saves_to_device() && self.rotate_files {
            debug!(file = %self.device_file, "deleting existing log files");
            backend
                .delete_remote_files(&self.device_file, device)
                .await
                .log_output();
        }

        let args = self.build_command()?.build();
        let mut result = backend.execute(args, device, backend.default_options()).await;

        if self.output_mode == LogcatOutputMode::LocalFile {
            if let Some(path) = &self.local_file {
                info!(path = %path.display(), "writing logcat to file");
                let mut file = tokio::fs::File::create(path).await?;
                for line in &result.output {
                    file.write_all(line.as_bytes()).await?;
                    file.write_all(b"\n").await?;
                }
                file.flush().await?;
                result.output.clear();
            }
        }

        let mut verdict = Verdict::NotSet;
        handle_result(&mut verdict, &result);
        Ok(verdict)
    }

    async fn run_continuous(&mut self, backend: &dyn AdbBackend) -> Result<Verdict> {
        let builder = self.build_command()?;
        let background = BackgroundLogcat::start(
            backend,
            &builder,
            self.device_id.clone(),
            self.device_file.clone(),
            self.rotate_files,
        )
        .await?;
        self.background = Some(background);
        Ok(Verdict::Pass)
    }
}

impl Step for LogcatStep {
    fn name(&self) -> &'static str {
        "logcat"
    }

    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let local_blank = self
            .local_file
            .as_ref()
            .is_none_or(|p| is_blank(&p.to_string_lossy()));

        if self.saves_to_local() && local_blank {
            errors.push(ValidationError::new(
                "local_file",
                "please set a valid local file path",
            ));
        }
        if self.saves_to_device() && is_blank(&self.device_file) {
            errors.push(ValidationError::new(
                "device_file",
                "please set a valid device file path",
            ));
        }
        if self.saves_to_device() && self.rotate_files {
            if self.rotate_kbytes == 0 {
                errors.push(ValidationError::new(
                    "rotate_kbytes",
                    "rotate file size must be larger than 0 Kb",
                ));
            }
            if self.rotate_count == 0 {
                errors.push(ValidationError::new(
                    "rotate_count",
                    "rotate file count must be larger than zero",
                ));
            }
        }
        errors
    }

    fn pre_plan_run(&mut self) {
        self.clean_filter_pairs();
    }

    fn run<'a>(&'a mut self, backend: &'a dyn AdbBackend) -> BoxFuture<'a, Result<Verdict>> {
        Box::pin(async move {
            match self.execution_mode {
                LogcatExecutionMode::Instant => self.run_instant(backend).await,
                LogcatExecutionMode::Continuous => self.run_continuous(backend).await,
            }
        })
    }
}

/// `logcat -c`: empty the device log buffers.
#[derive(Debug, Clone, Default)]
pub struct ClearLogcatStep {
    pub device_id: Option<String>,
}

impl Step for ClearLogcatStep {
    fn name(&self) -> &'static str {
        "clear logcat"
    }

    fn validate(&self) -> Vec<ValidationError> {
        Vec::new()
    }

    fn run<'a>(&'a mut self, backend: &'a dyn AdbBackend) -> BoxFuture<'a, Result<Verdict>> {
        Box::pin(async move {
            let args = LogcatCommandBuilder::clear().with_dump_and_exit(false).build();
            let result = backend
                .execute(args, self.device_id.as_deref(), backend.default_options())
                .await;
            let mut verdict = Verdict::NotSet;
            handle_result(&mut verdict, &result);
            Ok(verdict)
        })
    }
}

/// Stops a background logcat and collects what it wrote.
#[derive(Debug, Clone, Default)]
pub struct RetrieveBackgroundLogcatStep {
    /// Usually taken from a continuous [`LogcatStep`]'s `background`.
    pub background: Option<BackgroundLogcat>,
    pub delete_files: bool,
    pub local_file: Option<PathBuf>,
    /// Parent of the scratch directory used for rotated files.
    pub scratch_root: Option<PathBuf>,
}

impl RetrieveBackgroundLogcatStep {
    pub fn new(background: BackgroundLogcat, local_file: impl Into<PathBuf>) -> Self {
        Self {
            background: Some(background),
            local_file: Some(local_file.into()),
            ..Self::default()
        }
    }
}

impl Step for RetrieveBackgroundLogcatStep {
    fn name(&self) -> &'static str {
        "retrieve background logcat"
    }

    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.background.is_none() {
            errors.push(ValidationError::new(
                "background",
                "please select a background logcat from a continuous logcat step",
            ));
        }
        if self
            .local_file
            .as_ref()
            .is_none_or(|p| is_blank(&p.to_string_lossy()))
        {
            errors.push(ValidationError::new(
                "local_file",
                "please set a valid local file path",
            ));
        }
        errors
    }

    fn run<'a>(&'a mut self, backend: &'a dyn AdbBackend) -> BoxFuture<'a, Result<Verdict>> {
        Box::pin(async move {
            let mut verdict = Verdict::NotSet;
            let (Some(background), Some(local_file)) = (&self.background, &self.local_file) else {
                warn!("nothing to retrieve");
                return Ok(Verdict::Fail);
            };

            background.terminate().await.log_output();

            let retrieval = background
                .retrieve(backend, local_file, self.scratch_root.as_deref())
                .await?;
            if retrieval.listing_failed || (retrieval.is_empty() && !retrieval.skipped.is_empty()) {
                verdict.upgrade(Verdict::Fail);
            } else {
                verdict.upgrade(Verdict::Pass);
            }
            info!(
                files = retrieval.combined.len(),
                skipped = retrieval.skipped.len(),
                lines = retrieval.lines.len(),
                "retrieved background logcat"
            );

            if self.delete_files {
                background.delete_device_files(backend).await;
            }
            Ok(verdict)
        })
    }
}
