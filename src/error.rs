// Error types. Every variant states *where* things went wrong.
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failure while fetching or decoding the shape/overlay images.
///
/// Sources are behind `Arc` so one error can be logged and handed to the
/// host callback without losing the chain.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The fetcher could not produce bytes for the URL.
    #[error("failed to fetch image {url}: {source}")]
    Fetch { url: String, source: Arc<io::Error> },

    /// The bytes were not a supported image format.
    #[error("failed to decode image {url}: {source}")]
    Decode { url: String, source: Arc<image::ImageError> },

    /// Degenerate input: the image decoded to zero width or height.
    #[error("image {url} has zero size")]
    EmptyImage { url: String },

    /// The load task ended without reporting a result.
    #[error("image load interrupted")]
    Interrupted,
}

impl LoadError {
    pub fn fetch(url: &str, source: io::Error) -> Self {
        LoadError::Fetch { url: url.to_string(), source: Arc::new(source) }
    }

    pub fn decode(url: &str, source: image::ImageError) -> Self {
        LoadError::Decode { url: url.to_string(), source: Arc::new(source) }
    }

    /// True for the configuration-error subtype (degenerate inputs).
    pub fn is_configuration(&self) -> bool {
        matches!(self, LoadError::EmptyImage { .. })
    }
}

/// Crate-level error for setup paths (config files, demo window).
#[derive(Debug, Error)]
pub enum Error {
    /// Creating the window failed
    #[error("window init error: {0}")]
    WindowInit(String),

    /// Updating the window buffer failed
    #[error("window update error: {0}")]
    WindowUpdate(String),

    /// Reading a config file failed
    #[error("cannot read config {path}: {source}")]
    ConfigIo { path: PathBuf, source: io::Error },

    /// YAML/serde configuration error
    #[error(transparent)]
    ConfigParse(#[from] serde_yaml::Error),

    /// Brush radius or threshold out of range
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}
