// src/commands/logcat.rs

//! `adb logcat` argument builder.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::{AdbError, Result};
use crate::exec::AdbArgs;

/// Log buffers. Declaration order is the order `-b` options are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogcatBuffer {
    Radio,
    Events,
    Main,
    System,
    Crash,
}

impl LogcatBuffer {
    pub const ALL: [LogcatBuffer; 5] = [
        LogcatBuffer::Radio,
        LogcatBuffer::Events,
        LogcatBuffer::Main,
        LogcatBuffer::System,
        LogcatBuffer::Crash,
    ];

    /// What logcat reads when no buffer is requested explicitly.
    pub const DEFAULT: [LogcatBuffer; 1] = [LogcatBuffer::Main];

    pub fn name(self) -> &'static str {
        match self {
            LogcatBuffer::Radio => "radio",
            LogcatBuffer::Events => "events",
            LogcatBuffer::Main => "main",
            LogcatBuffer::System => "system",
            LogcatBuffer::Crash => "crash",
        }
    }
}

/// Output formats for `-v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogcatFormat {
    Brief,
    Long,
    Process,
    Raw,
    Tag,
    Thread,
    #[default]
    Threadtime,
    Time,
}

impl LogcatFormat {
    pub const ALL: [LogcatFormat; 8] = [
        LogcatFormat::Brief,
        LogcatFormat::Long,
        LogcatFormat::Process,
        LogcatFormat::Raw,
        LogcatFormat::Tag,
        LogcatFormat::Thread,
        LogcatFormat::Threadtime,
        LogcatFormat::Time,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LogcatFormat::Brief => "brief",
            LogcatFormat::Long => "long",
            LogcatFormat::Process => "process",
            LogcatFormat::Raw => "raw",
            LogcatFormat::Tag => "tag",
            LogcatFormat::Thread => "thread",
            LogcatFormat::Threadtime => "threadtime",
            LogcatFormat::Time => "time",
        }
    }
}

/// Message priorities, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogcatPriority {
    #[default]
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    Silent,
}

impl LogcatPriority {
    pub const ALL: [LogcatPriority; 7] = [
        LogcatPriority::Verbose,
        LogcatPriority::Debug,
        LogcatPriority::Info,
        LogcatPriority::Warning,
        LogcatPriority::Error,
        LogcatPriority::Fatal,
        LogcatPriority::Silent,
    ];

    /// Single-letter code used in filter specs.
    pub fn code(self) -> char {
        match self {
            LogcatPriority::Verbose => 'V',
            LogcatPriority::Debug => 'D',
            LogcatPriority::Info => 'I',
            LogcatPriority::Warning => 'W',
            LogcatPriority::Error => 'E',
            LogcatPriority::Fatal => 'F',
            LogcatPriority::Silent => 'S',
        }
    }

    fn name(self) -> &'static str {
        match self {
            LogcatPriority::Verbose => "verbose",
            LogcatPriority::Debug => "debug",
            LogcatPriority::Info => "info",
            LogcatPriority::Warning => "warning",
            LogcatPriority::Error => "error",
            LogcatPriority::Fatal => "fatal",
            LogcatPriority::Silent => "silent",
        }
    }
}

macro_rules! named_enum_traits {
    ($ty:ident, $what:literal, |$v:ident, $needle:ident| $matches:expr) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = AdbError;

            fn from_str(s: &str) -> Result<Self> {
                let $needle = s.trim().to_ascii_lowercase();
                $ty::ALL
                    .into_iter()
                    .find(|$v| $matches)
                    .ok_or_else(|| {
                        AdbError::InvalidArgument(format!(concat!("unknown logcat ", $what, " '{}'"), s))
                    })
            }
        }
    };
}

named_enum_traits!(LogcatBuffer, "buffer", |b, needle| b.name() == needle);
named_enum_traits!(LogcatFormat, "format", |f, needle| f.name() == needle);
named_enum_traits!(LogcatPriority, "priority", |p, needle| {
    p.name() == needle || (needle.len() == 1 && needle.eq_ignore_ascii_case(&p.code().to_string()))
});

/// Tag filter specs (`tag:P ... *:P`).
///
/// Tags keep the order they were first set in; setting a tag again replaces
/// its priority in place. The tag `*` addresses the default priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogcatFilter {
    tags: Vec<(String, LogcatPriority)>,
    default_priority: Option<LogcatPriority>,
}

impl LogcatFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `tag` at `priority` and silence everything else.
    pub fn single_tag(tag: &str, priority: LogcatPriority) -> Result<Self> {
        let mut filter = Self::new();
        filter.set_tag_priority(tag, priority)?;
        filter.default_priority = Some(LogcatPriority::Silent);
        Ok(filter)
    }

    pub fn set_tag_priority(&mut self, tag: &str, priority: LogcatPriority) -> Result<()> {
        let tag = non_blank_tag(tag)?;
        if tag == "*" {
            self.default_priority = Some(priority);
        } else if let Some(entry) = self.tags.iter_mut().find(|(t, _)| t == tag) {
            entry.1 = priority;
        } else {
            self.tags.push((tag.to_string(), priority));
        }
        Ok(())
    }

    pub fn unset_tag(&mut self, tag: &str) -> Result<()> {
        let tag = non_blank_tag(tag)?;
        if tag == "*" {
            self.default_priority = None;
        } else {
            self.tags.retain(|(t, _)| t != tag);
        }
        Ok(())
    }

    pub fn tag_priority(&self, tag: &str) -> Result<Option<LogcatPriority>> {
        let tag = non_blank_tag(tag)?;
        if tag == "*" {
            return Ok(self.default_priority);
        }
        Ok(self
            .tags
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, priority)| *priority))
    }

    pub fn default_priority(&self) -> Option<LogcatPriority> {
        self.default_priority
    }

    pub fn set_default_priority(&mut self, priority: Option<LogcatPriority>) {
        self.default_priority = priority;
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.default_priority.is_none()
    }

    /// One `tag:P` argument per tag, then `*:P` if a default is set.
    pub fn to_args(&self) -> Vec<String> {
        let mut specs: Vec<String> = self
            .tags
            .iter()
            .map(|(tag, priority)| format!("{tag}:{}", priority.code()))
            .collect();
        if let Some(priority) = self.default_priority {
            specs.push(format!("*:{}", priority.code()));
        }
        specs
    }
}

fn non_blank_tag(tag: &str) -> Result<&str> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(AdbError::InvalidArgument(
            "logcat filter tag must not be blank".to_string(),
        ));
    }
    Ok(tag)
}

/// Builds `logcat` argument vectors.
///
/// Output order: `logcat`, flag options (sorted), `-b` per buffer, `-f`,
/// `-v`, `-r`, `-n`, then the filter specs. A new builder dumps and exits
/// (`-d`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogcatCommandBuilder {
    flags: BTreeSet<&'static str>,
    buffers: BTreeSet<LogcatBuffer>,
    file_name: Option<String>,
    format: Option<LogcatFormat>,
    rotate_kbytes: Option<u32>,
    rotate_count: Option<u32>,
    filter: Option<LogcatFilter>,
}

impl Default for LogcatCommandBuilder {
    fn default() -> Self {
        Self {
            flags: BTreeSet::from(["-d"]),
            buffers: BTreeSet::new(),
            file_name: None,
            format: None,
            rotate_kbytes: None,
            rotate_count: None,
            filter: None,
        }
    }
}

impl LogcatCommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `logcat -c -d`: flush the log buffers.
    pub fn clear() -> Self {
        Self::new().with_clear(true)
    }

    /// Dump only `tag` (at `priority` or above).
    pub fn filter_single_tag(tag: &str, priority: LogcatPriority) -> Result<Self> {
        Ok(Self::new().with_filter(LogcatFilter::single_tag(tag, priority)?))
    }

    fn set_flag(&mut self, flag: &'static str, set: bool) {
        if set {
            self.flags.insert(flag);
        } else {
            self.flags.remove(flag);
        }
    }

    pub fn with_clear(mut self, clear: bool) -> Self {
        self.set_flag("-c", clear);
        self
    }

    pub fn with_dump_and_exit(mut self, dump: bool) -> Self {
        self.set_flag("-d", dump);
        self
    }

    pub fn clears(&self) -> bool {
        self.flags.contains("-c")
    }

    pub fn dumps_and_exits(&self) -> bool {
        self.flags.contains("-d")
    }

    pub fn with_buffers(mut self, buffers: impl IntoIterator<Item = LogcatBuffer>) -> Self {
        self.buffers = buffers.into_iter().collect();
        self
    }

    pub fn with_buffer(mut self, buffer: LogcatBuffer) -> Self {
        self.buffers.insert(buffer);
        self
    }

    /// Device-side output file. Blank or `stdout` means standard output.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_format(mut self, format: LogcatFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Rotate the output file every `kbytes`.
    pub fn with_rotate_kbytes(mut self, kbytes: u32) -> Self {
        self.rotate_kbytes = Some(kbytes);
        self
    }

    /// Keep at most `count` rotated files.
    pub fn with_rotate_count(mut self, count: u32) -> Self {
        self.rotate_count = Some(count);
        self
    }

    pub fn with_filter(mut self, filter: LogcatFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn filter(&self) -> Option<&LogcatFilter> {
        self.filter.as_ref()
    }

    pub fn build(&self) -> AdbArgs {
        let mut args = AdbArgs::new().arg("logcat").args(self.flags.iter().copied());

        for buffer in &self.buffers {
            args.push("-b");
            args.push(buffer.name());
        }

        if let Some(file) = self
            .file_name
            .as_deref()
            .filter(|f| !f.trim().is_empty() && *f != "stdout")
        {
            args.push("-f");
            args.push(file);
        }

        if let Some(format) = self.format {
            args.push("-v");
            args.push(format.name());
        }
        if let Some(kbytes) = self.rotate_kbytes {
            args.push("-r");
            args.push(kbytes.to_string());
        }
        if let Some(count) = self.rotate_count {
            args.push("-n");
            args.push(count.to_string());
        }
        if let Some(filter) = &self.filter {
            args = args.args(filter.to_args());
        }

        args
    }
}
