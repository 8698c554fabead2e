use std::time::Duration;

use thiserror::Error;

use crate::models::Side;

/// Request-level failure. Any of these aborts the whole extraction.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("OCR failed on {side} side: {source}")]
    Ocr {
        side: Side,
        #[source]
        source: OcrError,
    },

    #[error("OCR timed out on {side} side after {}s", .timeout.as_secs_f32())]
    OcrTimeout { side: Side, timeout: Duration },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reported by an OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Tesseract init error: {0}")]
    Init(String),

    #[error("Tesseract set image error: {0}")]
    Image(String),

    #[error("Tesseract recognition error: {0}")]
    Recognition(String),

    #[error("Temp file error: {0}")]
    TempFile(String),
}

/// Failure inside the preprocessing pipeline. Absorbed by
/// [`ImageProcessor::preprocess`](crate::processing::ImageProcessor::preprocess).
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Empty image buffer")]
    EmptyInput,

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode processed image: {0}")]
    Encode(#[source] image::ImageError),
}

impl ScanError {
    /// Exit code used by the command line front-end.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScanError::InvalidInput(_) => 2,
            _ => 1,
        }
    }
}
