// src/logcat/mod.rs

//! Log capture workflows built on the executor.
//!
//! - [`rotation`] orders rotated log file names.
//! - [`retrieval`] pulls and combines rotated (or single) device log files.
//! - [`background`] wraps a logcat capture left running on the device.

pub mod background;
pub mod retrieval;
pub mod rotation;

pub use background::BackgroundLogcat;
pub use retrieval::{Retrieval, RetrievalRequest, retrieve_rotated, retrieve_single};
pub use rotation::{RotationKey, RotationParser};
