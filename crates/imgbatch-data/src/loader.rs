use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::GenericImageView;
use imgbatch_core::Tensor;

use crate::error::{DataError, DataResult};

/// Loads one image as an `[h, w, 3]` tensor (channels last).
///
/// `pixel`, when given, is the requested square side length.
pub trait ImageLoader {
    fn load(&self, image_name: &str, pixel: Option<usize>) -> DataResult<Tensor<f32>>;
}

impl<F> ImageLoader for F
where
    F: Fn(&str, Option<usize>) -> DataResult<Tensor<f32>>,
{
    fn load(&self, image_name: &str, pixel: Option<usize>) -> DataResult<Tensor<f32>> {
        self(image_name, pixel)
    }
}

/// Reads `<dir>/<image_name>.<extension>` from disk with the `image` crate.
///
/// Pixels are converted to RGB and scaled to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct FileImageLoader {
    dir: PathBuf,
    extension: String,
    filter: FilterType,
}

impl FileImageLoader {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        FileImageLoader {
            dir: dir.as_ref().to_path_buf(),
            extension: "jpg".to_string(),
            filter: FilterType::Triangle,
        }
    }

    /// File extension appended to each image name (without the dot).
    pub fn extension(mut self, ext: &str) -> Self {
        self.extension = ext.trim_start_matches('.').to_string();
        self
    }

    /// Resampling filter used when resizing.
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn path_of(&self, image_name: &str) -> PathBuf {
        if self.extension.is_empty() {
            self.dir.join(image_name)
        } else {
            self.dir.join(format!("{}.{}", image_name, self.extension))
        }
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&self, image_name: &str, pixel: Option<usize>) -> DataResult<Tensor<f32>> {
        let side = pixel
            .map(|p| {
                u32::try_from(p).map_err(|_| {
                    DataError::InvalidConfig(format!("pixel {} exceeds the maximum image side", p))
                })
            })
            .transpose()?;

        let path = self.path_of(image_name);
        log::trace!("loading {}", path.display());
        let img = image::open(&path).map_err(|source| DataError::Image {
            path: path.display().to_string(),
            source,
        })?;

        let img = match side {
            Some(p) if img.dimensions() != (p, p) => img.resize_exact(p, p, self.filter),
            _ => img,
        };

        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        let data: Vec<f32> = rgb.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        Ok(Tensor::new(data, vec![h as usize, w as usize, 3])?)
    }
}
