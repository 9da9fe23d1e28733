// src/commands/mod.rs

//! Pure argument builders for adb invocations.
//!
//! Nothing in here spawns processes; every builder returns an
//! [`AdbArgs`](crate::exec::AdbArgs) for the executor to run.

pub mod am;
pub mod device;
pub mod install;
pub mod logcat;

pub use am::{AmCommand, AmCommandBuilder, Extra, ExtraType, Intent, IntentFlag};
pub use install::{InstallFlag, InstallOptions};
pub use logcat::{LogcatBuffer, LogcatCommandBuilder, LogcatFilter, LogcatFormat, LogcatPriority};
