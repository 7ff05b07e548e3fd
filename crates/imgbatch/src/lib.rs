//! # imgbatch
//!
//! Feeds images and multi-label targets to a training loop.
//!
//! ## Modules
//!
//! - **core** — Tensor storage: row-major `Tensor<T>` over `u8`/`f32`, shapes, errors
//! - **data** — Tag table, multi-hot encoder, image loader, augmentation, batch generators

/// Tensor storage.
pub use imgbatch_core as core;

/// Tables, encoders, loaders, augmentation and generators.
pub use imgbatch_data as data;

pub use imgbatch_data::{
    Batch, BatchGenerator, BoundedImageIter, DataError, DataResult, DualOutputGenerator,
    GeneratorConfig,
};
