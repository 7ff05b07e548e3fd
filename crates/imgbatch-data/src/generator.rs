use imgbatch_core::Tensor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::augment::{Augment, ImageAugmenter};
use crate::config::GeneratorConfig;
use crate::encoder::TagEncoder;
use crate::error::{DataError, DataResult};
use crate::frame::TagFrame;
use crate::loader::ImageLoader;

/// Number of channels of every image tensor.
pub const CHANNELS: usize = 3;

/// One training batch.
///
/// `images` is `[n, pixel, pixel, 3]`, `labels` is `[n, n_labels]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub images: Tensor<f32>,
    pub labels: Tensor<u8>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.images.shape().dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of batches needed to visit every row once.
pub fn steps_per_pass(rows: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    rows.div_ceil(batch_size)
}

/// Endless batch generator over a [`TagFrame`].
///
/// Rows are visited through a permutation of row positions. The first pass
/// follows table order; every time the cursor wraps the permutation is
/// reshuffled. With `aug_times > 0` each batch is followed by that many
/// augmented copies of its original rows.
pub struct BatchGenerator<L, E> {
    frame: TagFrame,
    loader: L,
    encoder: E,
    config: GeneratorConfig,
    indices: Vec<usize>,
    cursor: usize,
    passes: usize,
    rng: StdRng,
    augmenter: Option<Box<dyn Augment>>,
}

impl<L: ImageLoader, E: TagEncoder> BatchGenerator<L, E> {
    pub fn new(frame: TagFrame, loader: L, encoder: E, config: GeneratorConfig) -> DataResult<Self> {
        config.validate()?;
        if frame.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let augmenter: Option<Box<dyn Augment>> = if config.aug_times > 0 {
            let params = config.augment.clone().unwrap_or_default();
            Some(Box::new(ImageAugmenter::new(params)?))
        } else {
            None
        };

        log::info!(
            "batch generator: {} rows, batch size {}, {} steps per pass, {} augmented copies ({} rows per batch)",
            frame.len(),
            config.batch_size,
            steps_per_pass(frame.len(), config.batch_size),
            config.aug_times,
            config.rows_per_batch()
        );

        Ok(BatchGenerator {
            indices: (0..frame.len()).collect(),
            frame,
            loader,
            encoder,
            config,
            cursor: 0,
            passes: 0,
            rng,
            augmenter,
        })
    }

    /// Replace the augmentation transform.
    pub fn with_augmenter(mut self, augmenter: Box<dyn Augment>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    pub fn steps(&self) -> usize {
        steps_per_pass(self.frame.len(), self.config.batch_size)
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn aug_times(&self) -> usize {
        self.config.aug_times
    }

    pub fn n_labels(&self) -> usize {
        self.encoder.n_labels()
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn frame(&self) -> &TagFrame {
        &self.frame
    }

    /// Position of the next row within [`indices`](Self::indices).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current permutation of row positions.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Completed passes over the table.
    pub fn passes(&self) -> usize {
        self.passes
    }

    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor == self.indices.len() {
            self.indices.shuffle(&mut self.rng);
            self.cursor = 0;
            self.passes += 1;
            log::debug!("pass {} complete, reshuffled {} rows", self.passes, self.indices.len());
        }
    }

    fn load_image(&self, row: usize) -> DataResult<Tensor<f32>> {
        let name = self.frame.image_name(row)?;
        let image = self.loader.load(name, self.config.pixel)?;
        let side = self.config.side();
        let expected = [side, side, CHANNELS];
        if image.shape().dims() != expected {
            return Err(DataError::ImageShape {
                name: name.to_string(),
                expected: expected.to_vec(),
                got: image.shape_vec(),
            });
        }
        Ok(image)
    }

    fn load_label(&self, row: usize) -> DataResult<Tensor<u8>> {
        let encoded = self.encoder.encode(self.frame.tags(row)?)?;
        if encoded.len() != self.encoder.n_labels() {
            return Err(DataError::LabelWidth {
                expected: self.encoder.n_labels(),
                got: encoded.len(),
            });
        }
        Ok(Tensor::from_slice(&encoded))
    }

    /// Produce the next batch of `batch_size * (1 + aug_times)` rows.
    ///
    /// Augmented copies are stacked after the loaded rows along the batch axis.
    pub fn next_batch(&mut self) -> DataResult<Batch> {
        let b = self.config.batch_size;
        let side = self.config.side();
        let mut images = Tensor::zeros(vec![b, side, side, CHANNELS]);
        let mut labels = Tensor::zeros(vec![b, self.encoder.n_labels()]);

        for i in 0..b {
            let row = self.indices[self.cursor];
            images.set_sample(i, &self.load_image(row)?)?;
            labels.set_sample(i, &self.load_label(row)?)?;
            self.advance();
        }

        let aug_times = self.config.aug_times;
        if let Some(augmenter) = self.augmenter.as_mut().filter(|_| aug_times > 0) {
            let mut image_parts = Vec::with_capacity(1 + aug_times);
            let mut label_parts = Vec::with_capacity(1 + aug_times);
            for _ in 0..aug_times {
                let (aug_images, aug_labels) = augmenter.augment_batch(&images, &labels)?;
                image_parts.push(aug_images);
                label_parts.push(aug_labels);
            }
            image_parts.insert(0, images);
            label_parts.insert(0, labels);
            images = Tensor::concat_rows(&image_parts)?;
            labels = Tensor::concat_rows(&label_parts)?;
        }

        Ok(Batch { images, labels })
    }
}

impl<L: ImageLoader, E: TagEncoder> Iterator for BatchGenerator<L, E> {
    type Item = DataResult<Batch>;

    /// Never returns `None`.
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}
