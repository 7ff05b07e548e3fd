use imgbatch_core::TensorError;
use thiserror::Error;

/// Errors raised while building or pulling batches.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Batch size must be positive")]
    InvalidBatchSize,

    #[error("Unknown tag: {0:?}")]
    UnknownTag(String),

    #[error("Image {name} has shape {got:?}, expected {expected:?}")]
    ImageShape {
        name: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Label vector has width {got}, expected {expected}")]
    LabelWidth { expected: usize, got: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DataResult<T> = Result<T, DataError>;
