//! Domain errors callers may want to match on

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by curriculum, progress and config handling
#[derive(Error, Debug)]
pub enum GuideError {
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Invalid difficulty '{0}' (expected beginner, intermediate or advanced)")]
    InvalidDifficulty(String),

    #[error("Unsupported config file format: {0:?}")]
    UnsupportedConfig(PathBuf),
}
