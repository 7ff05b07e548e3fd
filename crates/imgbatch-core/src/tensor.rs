use crate::dtype::Element;
use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;

use serde::{Deserialize, Serialize};

/// N-dimensional tensor used for image and label batches.
///
/// Stores data in a flat contiguous `Vec<T>` with row-major (C-order) layout.
/// Axis 0 is the batch axis for every batch tensor produced by this workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Element")]
pub struct Tensor<T: Element> {
    data: Vec<T>,
    shape: Shape,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Element> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> TensorResult<Self> {
        let s = Shape::new(shape);
        if data.len() != s.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: s.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape: s })
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        Tensor::full(shape, T::ZERO)
    }

    /// Create a tensor filled with a constant value.
    pub fn full(shape: Vec<usize>, value: T) -> Self {
        let s = Shape::new(shape);
        Tensor {
            data: vec![value; s.numel()],
            shape: s,
        }
    }

    /// Create a 1-D tensor from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Size of the leading (batch) axis.
    pub fn len0(&self) -> TensorResult<usize> {
        self.shape.dim(0)
    }

    fn offset(&self, indices: &[usize]) -> TensorResult<usize> {
        if indices.len() != self.ndim() {
            return Err(TensorError::DimensionMismatch(format!(
                "Expected {} indices, got {}",
                self.ndim(),
                indices.len()
            )));
        }
        let strides = self.shape.strides();
        let mut offset = 0;
        for (axis, (&idx, &size)) in indices.iter().zip(self.shape.dims()).enumerate() {
            if idx >= size {
                return Err(TensorError::IndexOutOfBounds {
                    index: idx,
                    axis,
                    size,
                });
            }
            offset += idx * strides[axis];
        }
        Ok(offset)
    }

    /// Multi-dimensional indexing.
    pub fn get(&self, indices: &[usize]) -> TensorResult<T> {
        let offset = self.offset(indices)?;
        Ok(self.data[offset])
    }

    /// Set a single element.
    pub fn set(&mut self, indices: &[usize], value: T) -> TensorResult<()> {
        let offset = self.offset(indices)?;
        self.data[offset] = value;
        Ok(())
    }

    // ─── Axis-0 access ──────────────────────────────────────────────────────

    fn check_sample(&self, i: usize) -> TensorResult<usize> {
        let n = self.len0()?;
        if i >= n {
            return Err(TensorError::IndexOutOfBounds {
                index: i,
                axis: 0,
                size: n,
            });
        }
        Ok(self.shape.sample_numel())
    }

    /// Copy out the `i`-th slice along axis 0 (one sample of a batch).
    pub fn sample(&self, i: usize) -> TensorResult<Tensor<T>> {
        let stride = self.check_sample(i)?;
        Ok(Tensor {
            data: self.data[i * stride..(i + 1) * stride].to_vec(),
            shape: Shape::from_slice(&self.shape.dims()[1..]),
        })
    }

    /// Borrow the `i`-th slice along axis 0 as a flat slice.
    pub fn sample_data(&self, i: usize) -> TensorResult<&[T]> {
        let stride = self.check_sample(i)?;
        Ok(&self.data[i * stride..(i + 1) * stride])
    }

    /// Overwrite the `i`-th slice along axis 0.
    ///
    /// `value` must have exactly the trailing shape of `self`.
    pub fn set_sample(&mut self, i: usize, value: &Tensor<T>) -> TensorResult<()> {
        let stride = self.check_sample(i)?;
        let expected = &self.shape.dims()[1..];
        if value.shape.dims() != expected {
            return Err(TensorError::ShapeMismatch {
                expected: expected.to_vec(),
                got: value.shape_vec(),
            });
        }
        self.data[i * stride..(i + 1) * stride].copy_from_slice(&value.data);
        Ok(())
    }

    /// Slice along axis 0: returns `self[start..end]` for a tensor of any rank.
    pub fn slice_rows(&self, start: usize, end: usize) -> TensorResult<Tensor<T>> {
        let rows = self.len0()?;
        if start > end || end > rows {
            return Err(TensorError::InvalidRange {
                start,
                end,
                axis: 0,
                size: rows,
            });
        }
        let stride = self.shape.sample_numel();
        Ok(Tensor {
            data: self.data[start * stride..end * stride].to_vec(),
            shape: self.shape.with_leading(end - start)?,
        })
    }

    /// Slice columns from a 2-D tensor.
    pub fn slice_cols(&self, start: usize, end: usize) -> TensorResult<Tensor<T>> {
        if self.ndim() != 2 {
            return Err(TensorError::InvalidOperation(
                "slice_cols requires a 2D tensor".to_string(),
            ));
        }
        let rows = self.shape.dim(0)?;
        let cols = self.shape.dim(1)?;
        if start > end || end > cols {
            return Err(TensorError::InvalidRange {
                start,
                end,
                axis: 1,
                size: cols,
            });
        }
        let new_cols = end - start;
        let mut data = Vec::with_capacity(rows * new_cols);
        for row in self.data.chunks(cols.max(1)).take(rows) {
            data.extend_from_slice(&row[start..end]);
        }
        Tensor::new(data, vec![rows, new_cols])
    }

    /// Gather slices along axis 0 in the given order (repeats allowed).
    pub fn select_rows(&self, indices: &[usize]) -> TensorResult<Tensor<T>> {
        let mut data = Vec::with_capacity(indices.len() * self.shape.sample_numel());
        for &i in indices {
            data.extend_from_slice(self.sample_data(i)?);
        }
        Ok(Tensor {
            data,
            shape: self.shape.with_leading(indices.len())?,
        })
    }

    /// Stack batches end to end along axis 0.
    ///
    /// Every part must share the trailing shape of the first one.
    pub fn concat_rows(parts: &[Tensor<T>]) -> TensorResult<Tensor<T>> {
        let first = parts.first().ok_or(TensorError::EmptyTensor)?;
        first.len0()?;
        let trailing = &first.shape.dims()[1..];
        let mut rows = 0;
        for part in parts {
            if part.ndim() != first.ndim() || &part.shape.dims()[1..] != trailing {
                return Err(TensorError::ShapeMismatch {
                    expected: first.shape_vec(),
                    got: part.shape_vec(),
                });
            }
            rows += part.len0()?;
        }
        let mut data = Vec::with_capacity(rows * first.shape.sample_numel());
        for part in parts {
            data.extend_from_slice(&part.data);
        }
        Ok(Tensor {
            data,
            shape: first.shape.with_leading(rows)?,
        })
    }

    /// Smallest and largest element, or `None` for an empty tensor.
    pub fn min_max(&self) -> Option<(T, T)> {
        let first = *self.data.first()?;
        Some(self.data.iter().fold((first, first), |(lo, hi), &v| {
            (
                if v < lo { v } else { lo },
                if v > hi { v } else { hi },
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(n: usize) -> Tensor<f32> {
        let data: Vec<f32> = (0..n * 2 * 2 * 3).map(|v| v as f32).collect();
        Tensor::new(data, vec![n, 2, 2, 3]).unwrap()
    }

    #[test]
    fn test_creation() {
        let t: Tensor<u8> = Tensor::zeros(vec![3, 17]);
        assert_eq!(t.shape_vec(), vec![3, 17]);
        assert_eq!(t.numel(), 51);
        assert!(t.data().iter().all(|&v| v == 0));

        assert!(Tensor::<f32>::new(vec![1.0; 5], vec![2, 3]).is_err());
    }

    #[test]
    fn test_get_set() {
        let mut t: Tensor<u8> = Tensor::zeros(vec![2, 4]);
        t.set(&[1, 2], 1).unwrap();
        assert_eq!(t.get(&[1, 2]).unwrap(), 1);
        assert_eq!(t.data()[6], 1);
        assert!(t.get(&[2, 0]).is_err());
        assert!(t.get(&[0]).is_err());
    }

    #[test]
    fn test_sample_and_set_sample() {
        let mut t = batch(3);
        let s = t.sample(1).unwrap();
        assert_eq!(s.shape_vec(), vec![2, 2, 3]);
        assert_eq!(s.data()[0], 12.0);

        let ones: Tensor<f32> = Tensor::full(vec![2, 2, 3], 1.0);
        t.set_sample(2, &ones).unwrap();
        assert!(t.sample_data(2).unwrap().iter().all(|&v| v == 1.0));
        assert_eq!(t.sample_data(0).unwrap()[1], 1.0);

        let wrong: Tensor<f32> = Tensor::zeros(vec![3, 2, 2]);
        assert!(t.set_sample(0, &wrong).is_err());
        assert!(t.sample(3).is_err());
    }

    #[test]
    fn test_slice_rows_any_rank() {
        let t = batch(4);
        let s = t.slice_rows(1, 3).unwrap();
        assert_eq!(s.shape_vec(), vec![2, 2, 2, 3]);
        assert_eq!(s.data()[0], 12.0);
        assert_eq!(t.slice_rows(2, 2).unwrap().shape_vec(), vec![0, 2, 2, 3]);
        assert!(t.slice_rows(3, 5).is_err());
    }

    #[test]
    fn test_slice_cols() {
        let t: Tensor<u8> = Tensor::new(vec![1, 0, 1, 0, 0, 1, 1, 1], vec![2, 4]).unwrap();
        let head = t.slice_cols(0, 1).unwrap();
        let tail = t.slice_cols(1, 4).unwrap();
        assert_eq!(head.shape_vec(), vec![2, 1]);
        assert_eq!(head.data(), &[1, 0]);
        assert_eq!(tail.data(), &[0, 1, 0, 1, 1, 1]);
        assert!(t.slice_cols(2, 5).is_err());
    }

    #[test]
    fn test_select_rows() {
        let t: Tensor<u8> = Tensor::new(vec![1, 2, 3, 4, 5, 6], vec![3, 2]).unwrap();
        let s = t.select_rows(&[2, 0, 2]).unwrap();
        assert_eq!(s.shape_vec(), vec![3, 2]);
        assert_eq!(s.data(), &[5, 6, 1, 2, 5, 6]);
        assert!(t.select_rows(&[3]).is_err());
    }

    #[test]
    fn test_concat_rows() {
        let a = batch(2);
        let b = batch(1);
        let c = Tensor::concat_rows(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(c.shape_vec(), vec![3, 2, 2, 3]);
        assert_eq!(c.slice_rows(0, 2).unwrap(), a);
        assert_eq!(c.sample(2).unwrap(), b.sample(0).unwrap());

        let narrow: Tensor<u8> = Tensor::zeros(vec![2, 1]);
        let wide: Tensor<u8> = Tensor::zeros(vec![2, 2]);
        assert!(Tensor::concat_rows(&[narrow, wide]).is_err());
        assert_eq!(Tensor::<u8>::concat_rows(&[]), Err(TensorError::EmptyTensor));
    }

    #[test]
    fn test_min_max() {
        let t: Tensor<f32> = Tensor::from_slice(&[0.5, -1.0, 2.0]);
        assert_eq!(t.min_max(), Some((-1.0, 2.0)));
        assert_eq!(Tensor::<f32>::from_slice(&[]).min_max(), None);
    }
}
