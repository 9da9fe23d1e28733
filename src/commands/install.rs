// src/commands/install.rs

//! `adb install` flags.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::AdbError;

/// One `adb install` option.
///
/// Declaration order is the order flags are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstallFlag {
    ForwardLock,
    Replace,
    AllowTestPackages,
    SdCard,
    AllowDowngrade,
    GrantPermissions,
}

impl InstallFlag {
    pub const ALL: [InstallFlag; 6] = [
        InstallFlag::ForwardLock,
        InstallFlag::Replace,
        InstallFlag::AllowTestPackages,
        InstallFlag::SdCard,
        InstallFlag::AllowDowngrade,
        InstallFlag::GrantPermissions,
    ];

    pub fn flag(self) -> &'static str {
        match self {
            InstallFlag::ForwardLock => "-l",
            InstallFlag::Replace => "-r",
            InstallFlag::AllowTestPackages => "-t",
            InstallFlag::SdCard => "-s",
            InstallFlag::AllowDowngrade => "-d",
            InstallFlag::GrantPermissions => "-g",
        }
    }

    fn name(self) -> &'static str {
        match self {
            InstallFlag::ForwardLock => "forward-lock",
            InstallFlag::Replace => "replace",
            InstallFlag::AllowTestPackages => "allow-test",
            InstallFlag::SdCard => "sd-card",
            InstallFlag::AllowDowngrade => "downgrade",
            InstallFlag::GrantPermissions => "grant-permissions",
        }
    }
}

impl fmt::Display for InstallFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InstallFlag {
    type Err = AdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        InstallFlag::ALL
            .into_iter()
            .find(|flag| flag.name() == needle || flag.flag() == needle)
            .ok_or_else(|| AdbError::InvalidArgument(format!("unknown install option '{s}'")))
    }
}

/// A set of [`InstallFlag`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    flags: BTreeSet<InstallFlag>,
}

impl InstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, flag: InstallFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn insert(&mut self, flag: InstallFlag) {
        self.flags.insert(flag);
    }

    pub fn contains(&self, flag: InstallFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Command-line flags, in a fixed order regardless of insertion order.
    pub fn to_flags(&self) -> Vec<&'static str> {
        self.flags.iter().map(|flag| flag.flag()).collect()
    }
}

impl FromIterator<InstallFlag> for InstallOptions {
    fn from_iter<I: IntoIterator<Item = InstallFlag>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}
