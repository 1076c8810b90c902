//! Error taxonomy for fixture generation.

use fixturegen_env::BackendError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a fixture generation run.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Malformed waypoint sequence (non-zero start, non-monotonic times, bad rows)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    
    /// Unreadable or invalid run configuration
    #[error("Config error: {0}")]
    Config(String),
    
    /// Unreadable or invalid fiducial map
    #[error("Map format error: {0}")]
    MapFormat(String),
    
    /// Scene or video backend failure (missing texture, encoder error, ...)
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    
    /// Output or input file I/O failed
    #[error("I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FixtureError {
    /// Creates an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
    
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
    
    /// Creates a map format error.
    pub fn map_format(msg: impl Into<String>) -> Self {
        Self::MapFormat(msg.into())
    }
    
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
