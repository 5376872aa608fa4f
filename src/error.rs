//! Error types for the OCR engine.
//!
//! Each fallible surface gets its own variant set rather than one
//! catch-all enum, mirroring how the reference detector/recognizer
//! modules keep `OcrError` scoped to session and I/O failures.

use thiserror::Error;

/// Top-level error surface for the pipeline and its stages.
#[derive(Error, Debug)]
pub enum SpeedReaderError {
    /// Empty batch, zero-sized image, or unsupported pixel layout.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The inference runtime returned a non-OK status or a shape mismatch.
    /// The pipeline retries once with a fresh buffer before surfacing this.
    #[error("inference failed: {0}")]
    InferenceFailure(String),

    /// Convex hull or dilation collapsed below 3 points. Non-fatal: the
    /// caller drops the offending component and continues.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Cooperative cancellation observed at a suspension point.
    #[error("operation cancelled")]
    Cancelled,

    /// A sink-level invariant was violated (e.g. a sequence-number gap).
    /// Fatal: the owning pipeline instance refuses further submissions.
    #[error("pipeline faulted: {0}")]
    PipelineFaulted(String),

    #[error("onnx runtime error: {0}")]
    Ort(#[from] ort::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpeedReaderError>;

impl SpeedReaderError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PipelineFaulted(_))
    }
}
