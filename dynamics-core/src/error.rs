//! Errors in the library.
use thiserror::Error;

/// Errors raised by replay buffers.
#[derive(Error, Debug)]
pub enum BufferError {
    /// Sampling was attempted while the buffer holds no windows.
    #[error("Cannot sample from an empty buffer")]
    EmptyBuffer,

    /// Single-transition insertion, which the sequential buffer cannot
    /// support: one step cannot be windowed without its surrounding context.
    #[error("Single-step insertion is not supported; batch steps into paths instead")]
    StepInsertionUnsupported,

    /// A path's arrays disagree with each other or with the buffer dimensions.
    #[error("Path shape error: {0}")]
    PathShape(String),

    /// A flat transition dataset's arrays disagree with each other.
    #[error("Dataset shape error: {0}")]
    DatasetShape(String),
}
