//! Error types for the fixturegen backend layer.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by scene backends and video sinks.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An asset (e.g. a marker texture) is missing or could not be decoded
    #[error("Asset error ({}): {message}", path.display())]
    Asset { path: PathBuf, message: String },
    
    /// The renderer was asked for something it cannot produce
    #[error("Render error: {0}")]
    Render(String),
    
    /// A frame handed to a video sink does not match the stream size
    #[error("Frame size mismatch: stream is {expected_width}x{expected_height}, frame is {width}x{height}")]
    FrameSize {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
    
    /// Encoding a frame failed
    #[error("Encode error: {0}")]
    Encode(String),
    
    /// Underlying file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Creates an asset error for the given path.
    pub fn asset(path: &Path, msg: impl Into<String>) -> Self {
        Self::Asset {
            path: path.to_path_buf(),
            message: msg.into(),
        }
    }
    
    /// Creates a render error.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

impl From<image::ImageError> for BackendError {
    fn from(err: image::ImageError) -> Self {
        Self::Encode(err.to_string())
    }
}
