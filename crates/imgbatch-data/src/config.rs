use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::augment::AugmentParams;
use crate::error::{DataError, DataResult};

/// Side length used when no `pixel` is configured.
pub const DEFAULT_PIXEL: usize = 256;

/// Configuration shared by the batch generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of original rows per batch.
    pub batch_size: usize,
    /// Square side length images are loaded at; `None` means [`DEFAULT_PIXEL`].
    pub pixel: Option<usize>,
    /// Augmented copies appended to every batch (0 disables augmentation).
    pub aug_times: usize,
    /// Seed for the index shuffle.
    pub seed: Option<u64>,
    /// Augmentation settings; defaults are used when absent and `aug_times > 0`.
    pub augment: Option<AugmentParams>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            pixel: None,
            aug_times: 0,
            seed: None,
            augment: None,
        }
    }
}

impl GeneratorConfig {
    pub fn batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs;
        self
    }

    pub fn pixel(mut self, p: usize) -> Self {
        self.pixel = Some(p);
        self
    }

    pub fn aug_times(mut self, n: usize) -> Self {
        self.aug_times = n;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }

    pub fn augment(mut self, params: AugmentParams) -> Self {
        self.augment = Some(params);
        self
    }

    /// Side length of the produced image tensors.
    pub fn side(&self) -> usize {
        self.pixel.unwrap_or(DEFAULT_PIXEL)
    }

    /// Rows per produced batch, originals plus augmented copies.
    pub fn rows_per_batch(&self) -> usize {
        self.batch_size * (1 + self.aug_times)
    }

    pub fn validate(&self) -> DataResult<()> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize);
        }
        if self.pixel == Some(0) {
            return Err(DataError::InvalidConfig("pixel must be positive".to_string()));
        }
        if let Some(params) = &self.augment {
            params.validate()?;
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> DataResult<Self> {
        let config: GeneratorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> DataResult<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> DataResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
