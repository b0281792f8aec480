//! Error types shared across Pixbatch crates.

use std::path::PathBuf;

/// Top-level error type for Pixbatch operations.
///
/// Only [`PixbatchError::BatchAborted`] is fatal to a whole export. Every
/// other failure inside a composition is reported as a skipped layer instead
/// of an error.
#[derive(Debug, thiserror::Error)]
pub enum PixbatchError {
    #[error("Decode error for {id}: {message}")]
    Decode { id: String, message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Invalid settings: {message}")]
    InvalidSettings { message: String },

    #[error("Unknown item: {id}")]
    UnknownItem { id: String },

    #[error("Export aborted at item {index} ({name}): {source}")]
    BatchAborted {
        index: usize,
        name: String,
        #[source]
        source: Box<PixbatchError>,
    },

    #[error("Delivery error: {message}")]
    Delivery { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PixbatchError.
pub type PixbatchResult<T> = Result<T, PixbatchError>;

impl PixbatchError {
    pub fn decode(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            id: id.into(),
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings {
            message: msg.into(),
        }
    }

    pub fn unknown_item(id: impl Into<String>) -> Self {
        Self::UnknownItem { id: id.into() }
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery {
            message: msg.into(),
        }
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a per-item failure as the fatal batch error.
    pub fn aborted(index: usize, name: impl Into<String>, source: PixbatchError) -> Self {
        Self::BatchAborted {
            index,
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error ends an export batch rather than a single item.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::BatchAborted { .. } | Self::InvalidSettings { .. })
    }
}
