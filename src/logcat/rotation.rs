// src/logcat/rotation.rs

//! Ordering of rotated log files.
//!
//! logcat rotates `<name>` into `<name>.1`, `<name>.1` into `<name>.2`, and
//! so on. The unsuffixed file is the one currently being written; the higher
//! the suffix, the older the content.

use std::cmp::{Ordering, Reverse};

use regex::Regex;

use crate::errors::{AdbError, Result};

/// Position of one file within a rotated set.
///
/// Ordering: `Current` is greater than any `Rotated`; among rotated files a
/// larger index is greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationKey {
    Rotated(u64),
    Current,
}

impl Ord for RotationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RotationKey::Current, RotationKey::Current) => Ordering::Equal,
            (RotationKey::Current, RotationKey::Rotated(_)) => Ordering::Greater,
            (RotationKey::Rotated(_), RotationKey::Current) => Ordering::Less,
            (RotationKey::Rotated(a), RotationKey::Rotated(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for RotationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Extracts [`RotationKey`]s from file names sharing one base name.
#[derive(Debug, Clone)]
pub struct RotationParser {
    suffixed: Regex,
}

impl RotationParser {
    /// `prefix` is the device file name logcat writes to; only its last path
    /// component matters.
    pub fn new(prefix: &str) -> Result<Self> {
        let base = regex::escape(base_name(prefix.trim()));
        let suffixed = Regex::new(&format!(r"^{base}\.(\d+)$")).map_err(|e| {
            AdbError::InvalidArgument(format!("cannot match rotated files of '{prefix}': {e}"))
        })?;
        Ok(Self { suffixed })
    }

    /// Key for one listed name. Anything that is not `<base>.<N>` counts as
    /// current, including `N` too large to represent.
    pub fn key(&self, name: &str) -> RotationKey {
        self.suffixed
            .captures(base_name(name.trim()))
            .and_then(|caps| caps.get(1))
            .and_then(|index| index.as_str().parse().ok())
            .map_or(RotationKey::Current, RotationKey::Rotated)
    }

    /// Sort names oldest first: highest index first, current file last.
    /// Names with equal keys keep a stable, name-based order.
    pub fn combination_order<S: AsRef<str>>(&self, names: &mut [S]) {
        names.sort_by(|a, b| {
            let (a, b) = (a.as_ref(), b.as_ref());
            age_rank(self.key(a))
                .cmp(&age_rank(self.key(b)))
                .then_with(|| a.cmp(b))
        });
    }
}

/// Sort rank where older files come first.
fn age_rank(key: RotationKey) -> (bool, Reverse<u64>) {
    match key {
        RotationKey::Rotated(index) => (false, Reverse(index)),
        RotationKey::Current => (true, Reverse(0)),
    }
}

/// Last component of a device path (always `/`-separated).
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
