use thiserror::Error;

/// The error type for `DSCNet-Burn` operations.
///
/// Forward passes are total once a model is built, so almost every variant is
/// raised while validating a configuration or the shape of the backbone input.
#[derive(Error, Debug)]
pub enum DscNetError {
    /// Error for a kernel size without a well-defined center tap.
    #[error("Invalid kernel size: {kernel_size} (must be odd and positive)")]
    InvalidKernelSize {
        /// The rejected kernel size.
        kernel_size: usize,
    },

    /// Error for when an invalid model configuration is provided.
    /// This can happen if configuration parameters are logically inconsistent.
    #[error("Invalid model configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for a requested output level the backbone does not produce.
    #[error("Unknown output feature: {name}")]
    UnknownOutFeature {
        /// The requested level name.
        name: String,
    },

    /// Error for when an input tensor has an invalid shape.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },
}

/// A specialized `Result` type for `DSCNet-Burn` operations.
pub type DscNetResult<T> = Result<T, DscNetError>;
