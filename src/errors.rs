// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Expected command failures (non-zero exit, timeout) are *not* errors; they
//! come back as a `CommandResult` with `success == false`. The variants here
//! cover structural problems and launch failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AdbError>;
