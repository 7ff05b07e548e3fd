// Image augmentation: random affine transforms, flips and channel shifts
// applied to whole batches of channels-last images.

use imgbatch_core::Tensor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Produces one augmented copy of a batch per call.
///
/// `images` is `[n, h, w, c]`, `labels` is `[n, k]`. The returned pair has the
/// same shapes; the label of row `i` belongs to the image of row `i`.
pub trait Augment {
    fn augment_batch(
        &mut self,
        images: &Tensor<f32>,
        labels: &Tensor<u8>,
    ) -> DataResult<(Tensor<f32>, Tensor<u8>)>;
}

/// How points outside the image are filled by the affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// `cval` everywhere outside the image.
    Constant,
    /// Repeat the edge pixel.
    Nearest,
    /// Mirror about the pixel edge: `d c b a | a b c d | d c b a`.
    #[default]
    Reflect,
    /// Tile the image.
    Wrap,
}

impl FillMode {
    /// Map a possibly out-of-range index into `0..n`.
    fn index(self, i: i64, n: usize) -> usize {
        let n = n as i64;
        let mapped = match self {
            FillMode::Constant | FillMode::Nearest => i.clamp(0, n - 1),
            FillMode::Reflect => {
                let period = 2 * n;
                let m = i.rem_euclid(period);
                if m >= n {
                    period - 1 - m
                } else {
                    m
                }
            }
            FillMode::Wrap => i.rem_euclid(n),
        };
        mapped as usize
    }
}

/// Random augmentation settings.
///
/// Shift ranges below 1 are fractions of the image side, values of 1 or more
/// are pixels. Rotation is in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentParams {
    pub rotation_range: f64,
    pub width_shift_range: f64,
    pub height_shift_range: f64,
    pub zoom_range: f64,
    pub channel_shift_range: f64,
    pub horizontal_flip: bool,
    pub vertical_flip: bool,
    pub fill_mode: FillMode,
    pub cval: f32,
    /// Permute the rows of every augmented copy.
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self {
            rotation_range: 25.0,
            width_shift_range: 0.15,
            height_shift_range: 0.15,
            zoom_range: 0.1,
            channel_shift_range: 0.02,
            horizontal_flip: true,
            vertical_flip: true,
            fill_mode: FillMode::Reflect,
            cval: 0.0,
            shuffle: true,
            seed: None,
        }
    }
}

impl AugmentParams {
    /// Settings that leave every image untouched.
    pub fn identity() -> Self {
        Self {
            rotation_range: 0.0,
            width_shift_range: 0.0,
            height_shift_range: 0.0,
            zoom_range: 0.0,
            channel_shift_range: 0.0,
            horizontal_flip: false,
            vertical_flip: false,
            shuffle: false,
            ..Self::default()
        }
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }

    pub fn shuffle(mut self, s: bool) -> Self {
        self.shuffle = s;
        self
    }

    pub fn validate(&self) -> DataResult<()> {
        let ranges = [
            ("rotation_range", self.rotation_range),
            ("width_shift_range", self.width_shift_range),
            ("height_shift_range", self.height_shift_range),
            ("zoom_range", self.zoom_range),
            ("channel_shift_range", self.channel_shift_range),
        ];
        for (name, value) in ranges {
            if !value.is_finite() || value < 0.0 {
                return Err(DataError::InvalidConfig(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.zoom_range >= 1.0 {
            return Err(DataError::InvalidConfig(format!(
                "zoom_range must be below 1, got {}",
                self.zoom_range
            )));
        }
        Ok(())
    }
}

/// One concrete draw of the random transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    /// Rotation in degrees.
    pub theta: f64,
    /// Shift along rows, in pixels.
    pub tx: f64,
    /// Shift along columns, in pixels.
    pub ty: f64,
    pub zx: f64,
    pub zy: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub channel_shift: f32,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            theta: 0.0,
            tx: 0.0,
            ty: 0.0,
            zx: 1.0,
            zy: 1.0,
            flip_horizontal: false,
            flip_vertical: false,
            channel_shift: 0.0,
        }
    }
}

impl TransformParams {
    fn is_affine_identity(&self) -> bool {
        self.theta == 0.0 && self.tx == 0.0 && self.ty == 0.0 && self.zx == 1.0 && self.zy == 1.0
    }
}

fn symmetric(rng: &mut StdRng, range: f64) -> f64 {
    if range > 0.0 {
        rng.gen_range(-range..=range)
    } else {
        0.0
    }
}

fn shift_pixels(rng: &mut StdRng, range: f64, side: usize) -> f64 {
    let shift = symmetric(rng, range);
    if range < 1.0 {
        shift * side as f64
    } else {
        shift
    }
}

/// Random image augmenter driven by [`AugmentParams`].
#[derive(Debug, Clone)]
pub struct ImageAugmenter {
    params: AugmentParams,
    rng: StdRng,
}

impl ImageAugmenter {
    pub fn new(params: AugmentParams) -> DataResult<Self> {
        params.validate()?;
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(ImageAugmenter { params, rng })
    }

    pub fn params(&self) -> &AugmentParams {
        &self.params
    }

    /// Draw transform parameters for an image of the given size.
    pub fn random_transform(&mut self, height: usize, width: usize) -> TransformParams {
        let p = &self.params;
        let rng = &mut self.rng;
        let theta = symmetric(rng, p.rotation_range);
        let tx = shift_pixels(rng, p.height_shift_range, height);
        let ty = shift_pixels(rng, p.width_shift_range, width);
        let (zx, zy) = if p.zoom_range > 0.0 {
            let lo = 1.0 - p.zoom_range;
            let hi = 1.0 + p.zoom_range;
            (rng.gen_range(lo..=hi), rng.gen_range(lo..=hi))
        } else {
            (1.0, 1.0)
        };
        let flip_horizontal = p.horizontal_flip && rng.gen::<f64>() < 0.5;
        let flip_vertical = p.vertical_flip && rng.gen::<f64>() < 0.5;
        let channel_shift = symmetric(rng, p.channel_shift_range) as f32;

        TransformParams {
            theta,
            tx,
            ty,
            zx,
            zy,
            flip_horizontal,
            flip_vertical,
            channel_shift,
        }
    }

    /// Apply a concrete transform to one `[h, w, c]` image.
    ///
    /// Order: affine warp, channel shift, flips. The channel shift clips to the
    /// value range of the warped image.
    pub fn apply_transform(
        &self,
        image: &Tensor<f32>,
        t: &TransformParams,
    ) -> DataResult<Tensor<f32>> {
        let (h, w, c) = match image.shape().dims() {
            &[h, w, c] => (h, w, c),
            dims => {
                return Err(DataError::InvalidConfig(format!(
                    "augmentation expects [h, w, c] images, got {:?}",
                    dims
                )))
            }
        };
        if image.numel() == 0 {
            return Ok(image.clone());
        }

        let mut out = if t.is_affine_identity() {
            image.clone()
        } else {
            Tensor::new(self.warp(image.data(), h, w, c, t), vec![h, w, c])?
        };

        // Clip to the range of the warped image, fill included.
        if t.channel_shift != 0.0 {
            if let Some((lo, hi)) = out.min_max() {
                for v in out.data_mut() {
                    *v = (*v + t.channel_shift).clamp(lo, hi);
                }
            }
        }
        let out_data = out.data_mut();
        if t.flip_horizontal {
            for row in out_data.chunks_mut(w * c) {
                for col in 0..w / 2 {
                    for ch in 0..c {
                        row.swap(col * c + ch, (w - 1 - col) * c + ch);
                    }
                }
            }
        }
        if t.flip_vertical {
            let stride = w * c;
            for r in 0..h / 2 {
                let (top, bottom) = out_data.split_at_mut((h - 1 - r) * stride);
                top[r * stride..(r + 1) * stride].swap_with_slice(&mut bottom[..stride]);
            }
        }

        Ok(out)
    }

    /// Inverse-map every output pixel into the source image around its centre
    /// and sample bilinearly.
    fn warp(&self, src: &[f32], h: usize, w: usize, c: usize, t: &TransformParams) -> Vec<f32> {
        let (sin, cos) = t.theta.to_radians().sin_cos();
        let or = h as f64 / 2.0 - 0.5;
        let oc = w as f64 / 2.0 - 0.5;
        let mode = self.params.fill_mode;
        let cval = self.params.cval;
        let mut out = vec![0.0f32; h * w * c];

        for r in 0..h {
            for col in 0..w {
                // zoom, then shift, then rotate
                let zr = t.zx * (r as f64 - or) + t.tx;
                let zc = t.zy * (col as f64 - oc) + t.ty;
                let sr = cos * zr - sin * zc + or;
                let sc = sin * zr + cos * zc + oc;

                let dst = (r * w + col) * c;
                if mode == FillMode::Constant
                    && (sr < 0.0 || sc < 0.0 || sr > (h - 1) as f64 || sc > (w - 1) as f64)
                {
                    out[dst..dst + c].iter_mut().for_each(|v| *v = cval);
                    continue;
                }

                let r0 = sr.floor();
                let c0 = sc.floor();
                let fr = (sr - r0) as f32;
                let fc = (sc - c0) as f32;
                let r0i = mode.index(r0 as i64, h);
                let r1i = mode.index(r0 as i64 + 1, h);
                let c0i = mode.index(c0 as i64, w);
                let c1i = mode.index(c0 as i64 + 1, w);

                for ch in 0..c {
                    let at = |rr: usize, cc: usize| src[(rr * w + cc) * c + ch];
                    let top = at(r0i, c0i) * (1.0 - fc) + at(r0i, c1i) * fc;
                    let bottom = at(r1i, c0i) * (1.0 - fc) + at(r1i, c1i) * fc;
                    out[dst + ch] = top * (1.0 - fr) + bottom * fr;
                }
            }
        }
        out
    }
}

impl Augment for ImageAugmenter {
    fn augment_batch(
        &mut self,
        images: &Tensor<f32>,
        labels: &Tensor<u8>,
    ) -> DataResult<(Tensor<f32>, Tensor<u8>)> {
        let n = images.len0()?;
        let n_labels = labels.len0()?;
        if n != n_labels {
            return Err(DataError::Tensor(imgbatch_core::TensorError::ShapeMismatch {
                expected: images.shape().with_leading(n)?.to_vec(),
                got: labels.shape_vec(),
            }));
        }

        let mut order: Vec<usize> = (0..n).collect();
        if self.params.shuffle {
            order.shuffle(&mut self.rng);
        }

        let mut out_images = Tensor::zeros(images.shape_vec());
        for (k, &i) in order.iter().enumerate() {
            let image = images.sample(i)?;
            let dims = image.shape().dims();
            let (h, w) = (dims.first().copied().unwrap_or(0), dims.get(1).copied().unwrap_or(0));
            let t = self.random_transform(h, w);
            out_images.set_sample(k, &self.apply_transform(&image, &t)?)?;
        }
        let out_labels = labels.select_rows(&order)?;
        Ok((out_images, out_labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// `[h, w, 1]` image holding `r * w + c` at each pixel.
    fn ramp(h: usize, w: usize) -> Tensor<f32> {
        let data = (0..h * w).map(|v| v as f32).collect();
        Tensor::new(data, vec![h, w, 1]).unwrap()
    }

    fn augmenter(fill_mode: FillMode) -> ImageAugmenter {
        ImageAugmenter::new(AugmentParams {
            fill_mode,
            ..AugmentParams::identity()
        })
        .unwrap()
    }

    #[test]
    fn test_default_params() {
        let p = AugmentParams::default();
        assert_eq!(p.rotation_range, 25.0);
        assert_eq!(p.fill_mode, FillMode::Reflect);
        assert!(p.horizontal_flip && p.vertical_flip && p.shuffle);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let p = AugmentParams {
            zoom_range: 1.5,
            ..AugmentParams::default()
        };
        assert!(matches!(p.validate(), Err(DataError::InvalidConfig(_))));
        let p = AugmentParams {
            rotation_range: -1.0,
            ..AugmentParams::default()
        };
        assert!(ImageAugmenter::new(p).is_err());
    }

    #[test]
    fn test_fill_mode_index() {
        assert_eq!(FillMode::Reflect.index(-1, 4), 0);
        assert_eq!(FillMode::Reflect.index(-2, 4), 1);
        assert_eq!(FillMode::Reflect.index(4, 4), 3);
        assert_eq!(FillMode::Reflect.index(5, 4), 2);
        assert_eq!(FillMode::Nearest.index(9, 4), 3);
        assert_eq!(FillMode::Wrap.index(-1, 4), 3);
        assert_eq!(FillMode::Wrap.index(4, 4), 0);
    }

    #[test]
    fn test_identity_transform() {
        let aug = augmenter(FillMode::Reflect);
        let img = ramp(3, 4);
        let out = aug.apply_transform(&img, &TransformParams::default()).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let aug = augmenter(FillMode::Nearest);
        let img = ramp(3, 3);
        let t = TransformParams {
            theta: 90.0,
            ..TransformParams::default()
        };
        let out = aug.apply_transform(&img, &t).unwrap();
        // out[r, c] = in[c', r'] with the source rotated about the centre.
        assert_abs_diff_eq!(out.get(&[0, 0, 0]).unwrap(), img.get(&[2, 0, 0]).unwrap(), epsilon = 1e-4);
        assert_abs_diff_eq!(out.get(&[1, 1, 0]).unwrap(), img.get(&[1, 1, 0]).unwrap(), epsilon = 1e-4);
        assert_abs_diff_eq!(out.get(&[0, 2, 0]).unwrap(), img.get(&[0, 0, 0]).unwrap(), epsilon = 1e-4);
    }

    #[test]
    fn test_shift_with_fill_modes() {
        let img = ramp(3, 2);
        let t = TransformParams {
            tx: 1.0,
            ..TransformParams::default()
        };

        let out = augmenter(FillMode::Nearest).apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[2.0, 3.0, 4.0, 5.0, 4.0, 5.0]);

        let out = augmenter(FillMode::Wrap).apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[2.0, 3.0, 4.0, 5.0, 0.0, 1.0]);

        let out = augmenter(FillMode::Constant).apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[2.0, 3.0, 4.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_reflect_fill_through_warp() {
        let img = ramp(3, 2);
        let t = TransformParams {
            tx: 2.0,
            ..TransformParams::default()
        };
        // Source rows 2, 3, 4 map to 2, 2, 1 under half-sample reflection.
        let out = augmenter(FillMode::Reflect).apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[4.0, 5.0, 4.0, 5.0, 2.0, 3.0]);

        let out = augmenter(FillMode::Nearest).apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[4.0, 5.0, 4.0, 5.0, 4.0, 5.0]);
    }

    #[test]
    fn test_zoom_about_centre() {
        let aug = augmenter(FillMode::Nearest);
        let column = ramp(5, 1);

        let zoom_in = TransformParams {
            zx: 0.5,
            ..TransformParams::default()
        };
        let out = aug.apply_transform(&column, &zoom_in).unwrap();
        for (got, want) in out.data().iter().zip([1.0, 1.5, 2.0, 2.5, 3.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-5);
        }

        let zoom_out = TransformParams {
            zx: 2.0,
            ..TransformParams::default()
        };
        let out = aug.apply_transform(&column, &zoom_out).unwrap();
        assert_eq!(out.data(), &[0.0, 0.0, 2.0, 4.0, 4.0]);

        // zx scales rows only, zy scales columns only.
        let row = ramp(1, 5);
        let out = aug.apply_transform(&row, &zoom_out).unwrap();
        assert_eq!(out, row);
        let zoom_in_cols = TransformParams {
            zy: 0.5,
            ..TransformParams::default()
        };
        let out = aug.apply_transform(&row, &zoom_in_cols).unwrap();
        for (got, want) in out.data().iter().zip([1.0, 1.5, 2.0, 2.5, 3.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_channel_shift_clips_to_warped_range() {
        let img = Tensor::new(vec![0.2, 0.3, 0.4, 0.5, 0.6, 0.7], vec![3, 2, 1]).unwrap();
        let t = TransformParams {
            tx: 1.0,
            channel_shift: 0.1,
            ..TransformParams::default()
        };
        // The constant fill (0.0) widens the range, so the border shifts to 0.1.
        let out = augmenter(FillMode::Constant).apply_transform(&img, &t).unwrap();
        for (got, want) in out.data().iter().zip([0.5, 0.6, 0.7, 0.7, 0.1, 0.1]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_flips() {
        let aug = augmenter(FillMode::Reflect);
        let img = ramp(2, 3);
        let t = TransformParams {
            flip_horizontal: true,
            ..TransformParams::default()
        };
        let out = aug.apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[2.0, 1.0, 0.0, 5.0, 4.0, 3.0]);

        let t = TransformParams {
            flip_vertical: true,
            ..TransformParams::default()
        };
        let out = aug.apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[3.0, 4.0, 5.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_flip_keeps_channels_together() {
        let aug = augmenter(FillMode::Reflect);
        let img = Tensor::new(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], vec![1, 2, 3]).unwrap();
        let t = TransformParams {
            flip_horizontal: true,
            ..TransformParams::default()
        };
        let out = aug.apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[0.4, 0.5, 0.6, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_channel_shift_clips_to_image_range() {
        let aug = augmenter(FillMode::Reflect);
        let img = Tensor::new(vec![0.0, 0.5, 1.0, 0.25], vec![2, 2, 1]).unwrap();
        let t = TransformParams {
            channel_shift: 0.5,
            ..TransformParams::default()
        };
        let out = aug.apply_transform(&img, &t).unwrap();
        assert_eq!(out.data(), &[0.5, 1.0, 1.0, 0.75]);
    }

    #[test]
    fn test_augment_batch_labels_follow_images() {
        let n = 6;
        let mut images: Tensor<f32> = Tensor::zeros(vec![n, 2, 2, 3]);
        let mut labels: Tensor<u8> = Tensor::zeros(vec![n, n]);
        for i in 0..n {
            images.set_sample(i, &Tensor::full(vec![2, 2, 3], i as f32)).unwrap();
            labels.set(&[i, i], 1).unwrap();
        }

        let mut aug = ImageAugmenter::new(AugmentParams::identity().shuffle(true).seed(7)).unwrap();
        let (x, y) = aug.augment_batch(&images, &labels).unwrap();
        assert_eq!(x.shape_vec(), images.shape_vec());
        assert_eq!(y.shape_vec(), labels.shape_vec());
        for k in 0..n {
            let value = x.sample_data(k).unwrap()[0] as usize;
            assert_eq!(y.get(&[k, value]).unwrap(), 1);
        }
    }

    #[test]
    fn test_random_augment_stays_in_range() {
        let mut images: Tensor<f32> = Tensor::zeros(vec![4, 8, 8, 3]);
        for (i, v) in images.data_mut().iter_mut().enumerate() {
            *v = (i % 7) as f32 / 6.0;
        }
        let labels: Tensor<u8> = Tensor::zeros(vec![4, 17]);

        let mut aug = ImageAugmenter::new(AugmentParams::default().seed(3)).unwrap();
        let (x, _) = aug.augment_batch(&images, &labels).unwrap();
        assert!(x.data().iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_mismatched_batch() {
        let images: Tensor<f32> = Tensor::zeros(vec![2, 2, 2, 3]);
        let labels: Tensor<u8> = Tensor::zeros(vec![3, 17]);
        let mut aug = augmenter(FillMode::Reflect);
        assert!(aug.augment_batch(&images, &labels).is_err());
    }
}
