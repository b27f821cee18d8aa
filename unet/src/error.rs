use thiserror::Error;

/// The error type for `unet-burn` operations.
///
/// Covers everything that can go wrong before the computation graph takes
/// over: dataset discovery, image decoding, and model configuration. Shape
/// violations inside the graph itself surface as framework panics.
#[derive(Error, Debug)]
pub enum UNetError {
    /// Error for when dataset discovery or loading fails.
    #[error("Dataset error: {message}")]
    Dataset {
        /// The error message.
        message: String,
    },

    /// Error for when an image or mask file cannot be decoded.
    #[cfg(feature = "train")]
    #[error("Failed to decode {path}: {source}")]
    ImageDecode {
        /// Path of the offending file.
        path: String,
        /// The underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Error for when an invalid model or pipeline configuration is provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when an input tensor has an invalid shape.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// Error for filesystem failures during dataset scanning.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for `unet-burn` operations.
pub type UNetResult<T> = Result<T, UNetError>;
