//! # imgbatch-data
//!
//! Batch generators that turn a table of image references and tag strings
//! into fixed-size image/label tensor batches for a training loop.
//!
//! - [`BatchGenerator`]: endless, reshuffles on every pass, optional
//!   augmented copies spliced after each batch
//! - [`BoundedImageIter`]: one ordered pass, images only
//! - [`DualOutputGenerator`]: labels split across two named outputs

pub mod augment;
pub mod bounded;
pub mod config;
pub mod dual;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod generator;
pub mod loader;

pub use augment::{Augment, AugmentParams, FillMode, ImageAugmenter, TransformParams};
pub use bounded::BoundedImageIter;
pub use config::{GeneratorConfig, DEFAULT_PIXEL};
pub use dual::{DualBatch, DualOutputGenerator, OutputSplit, CLOUD_OUTPUT, COMMON_OUTPUT};
pub use encoder::{FnEncoder, MultiHotEncoder, TagEncoder, N_CLOUDS, N_LABELS, PLANET_LABELS};
pub use error::{DataError, DataResult};
pub use frame::{TagFrame, TagRecord};
pub use generator::{steps_per_pass, Batch, BatchGenerator, CHANNELS};
pub use loader::{FileImageLoader, ImageLoader};
