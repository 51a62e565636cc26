use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the hair segmentation overlay.
///
/// Each variant carries the context of its failure domain (filesystem,
/// image processing, model operations) so callers can react without
/// parsing error strings. Display implementations come from thiserror.
#[derive(Error, Debug)]
pub enum HairSegError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed")]
    ImageProcessing {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, HairSegError>;

/// Convert anyhow errors to configuration errors.
///
/// Some helpers return `anyhow::Error`, which lacks structured context.
/// Conversion happens at the boundary; code that knows its failure domain
/// should construct the specific variant directly instead.
impl From<anyhow::Error> for HairSegError {
    fn from(err: anyhow::Error) -> Self {
        HairSegError::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for HairSegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for HairSegError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert ONNX Runtime errors to model errors.
impl From<ort::Error> for HairSegError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert ndarray shape errors to model errors.
///
/// Shape errors only occur while shuffling tensors for inference, so they
/// belong to the model domain rather than a separate tensor category.
impl From<ndarray::ShapeError> for HairSegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}
