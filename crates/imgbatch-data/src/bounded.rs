use imgbatch_core::Tensor;

use crate::config::GeneratorConfig;
use crate::error::{DataError, DataResult};
use crate::frame::TagFrame;
use crate::generator::{steps_per_pass, CHANNELS};
use crate::loader::ImageLoader;

/// Single pass over a [`TagFrame`] in table order, yielding image-only batches.
///
/// The last batch holds the remaining `len % batch_size` rows when the table
/// does not divide evenly. Iteration ends with `None` once every row has been
/// visited; labels are never read.
///
/// A row that fails to load is reported as one `Err` item in its place. Rows
/// loaded before it in the same batch come out first as a shorter batch, so
/// every other row is still yielded in order.
pub struct BoundedImageIter<L> {
    frame: TagFrame,
    loader: L,
    batch_size: usize,
    pixel: Option<usize>,
    side: usize,
    cursor: usize,
    pending: Option<DataError>,
}

impl<L: ImageLoader> BoundedImageIter<L> {
    /// Only `batch_size` and `pixel` are read from `config`.
    pub fn new(frame: TagFrame, loader: L, config: &GeneratorConfig) -> DataResult<Self> {
        config.validate()?;
        Ok(BoundedImageIter {
            frame,
            loader,
            batch_size: config.batch_size,
            pixel: config.pixel,
            side: config.side(),
            cursor: 0,
            pending: None,
        })
    }

    pub fn steps(&self) -> usize {
        steps_per_pass(self.frame.len(), self.batch_size)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.frame.len() - self.cursor
    }

    /// Next batch, or `None` once the table is exhausted.
    pub fn next_batch(&mut self) -> Option<DataResult<Tensor<f32>>> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }
        if self.cursor == self.frame.len() {
            return None;
        }
        let n = self.batch_size.min(self.remaining());
        Some(self.load_rows(n))
    }

    fn load_rows(&mut self, n: usize) -> DataResult<Tensor<f32>> {
        let mut images = Tensor::zeros(vec![n, self.side, self.side, CHANNELS]);
        for i in 0..n {
            let loaded = self.load_image(self.cursor);
            self.cursor += 1;
            match loaded {
                Ok(image) => images.set_sample(i, &image)?,
                Err(err) if i == 0 => return Err(err),
                Err(err) => {
                    log::warn!("row {} failed to load, yielding {} rows before it", self.cursor - 1, i);
                    self.pending = Some(err);
                    return Ok(images.slice_rows(0, i)?);
                }
            }
        }
        Ok(images)
    }

    fn load_image(&self, row: usize) -> DataResult<Tensor<f32>> {
        let expected = [self.side, self.side, CHANNELS];
        let name = self.frame.image_name(row)?;
        let image = self.loader.load(name, self.pixel)?;
        if image.shape().dims() != expected {
            return Err(DataError::ImageShape {
                name: name.to_string(),
                expected: expected.to_vec(),
                got: image.shape_vec(),
            });
        }
        Ok(image)
    }
}

impl<L: ImageLoader> Iterator for BoundedImageIter<L> {
    type Item = DataResult<Tensor<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }

    /// Failed rows can split a batch, so only the error-free count is exact.
    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = usize::from(self.pending.is_some());
        let lower = steps_per_pass(self.remaining(), self.batch_size) + pending;
        (lower, Some(self.remaining() + pending))
    }
}

impl<L: ImageLoader> std::iter::FusedIterator for BoundedImageIter<L> {}
