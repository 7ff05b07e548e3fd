use std::collections::HashMap;

use imgbatch_core::Tensor;

use crate::encoder::{TagEncoder, N_CLOUDS};
use crate::error::{DataError, DataResult};
use crate::generator::BatchGenerator;
use crate::loader::ImageLoader;

pub const CLOUD_OUTPUT: &str = "cloud_output";
pub const COMMON_OUTPUT: &str = "common_output";

/// Where to cut the label matrix and what to call the two halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSplit {
    /// Columns `..split_at` go to `head`, the rest to `tail`.
    pub split_at: usize,
    pub head: String,
    pub tail: String,
}

impl Default for OutputSplit {
    /// Weather labels vs. land-cover labels.
    fn default() -> Self {
        Self {
            split_at: N_CLOUDS,
            head: CLOUD_OUTPUT.to_string(),
            tail: COMMON_OUTPUT.to_string(),
        }
    }
}

/// A batch whose labels are split across named outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct DualBatch {
    pub images: Tensor<f32>,
    pub outputs: HashMap<String, Tensor<u8>>,
}

impl DualBatch {
    pub fn output(&self, name: &str) -> Option<&Tensor<u8>> {
        self.outputs.get(name)
    }
}

/// [`BatchGenerator`] for two-headed models.
pub struct DualOutputGenerator<L, E> {
    inner: BatchGenerator<L, E>,
    split: OutputSplit,
}

impl<L: ImageLoader, E: TagEncoder> DualOutputGenerator<L, E> {
    pub fn new(inner: BatchGenerator<L, E>, split: OutputSplit) -> DataResult<Self> {
        if split.split_at > inner.n_labels() {
            return Err(DataError::InvalidConfig(format!(
                "cannot split {} labels at column {}",
                inner.n_labels(),
                split.split_at
            )));
        }
        if split.head == split.tail {
            return Err(DataError::InvalidConfig(format!(
                "output names must differ, both are {:?}",
                split.head
            )));
        }
        Ok(DualOutputGenerator { inner, split })
    }

    pub fn inner(&self) -> &BatchGenerator<L, E> {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut BatchGenerator<L, E> {
        &mut self.inner
    }

    pub fn split(&self) -> &OutputSplit {
        &self.split
    }

    pub fn steps(&self) -> usize {
        self.inner.steps()
    }

    pub fn next_batch(&mut self) -> DataResult<DualBatch> {
        let batch = self.inner.next_batch()?;
        let n_labels = self.inner.n_labels();
        let head = batch.labels.slice_cols(0, self.split.split_at)?;
        let tail = batch.labels.slice_cols(self.split.split_at, n_labels)?;

        let mut outputs = HashMap::with_capacity(2);
        outputs.insert(self.split.head.clone(), head);
        outputs.insert(self.split.tail.clone(), tail);
        Ok(DualBatch {
            images: batch.images,
            outputs,
        })
    }
}

impl<L: ImageLoader, E: TagEncoder> Iterator for DualOutputGenerator<L, E> {
    type Item = DataResult<DualBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}
