use crate::error::{TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// Represents the shape of a tensor (dimensions).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    pub fn from_slice(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Size along a specific axis.
    pub fn dim(&self, axis: usize) -> TensorResult<usize> {
        self.dims.get(axis).copied().ok_or(TensorError::InvalidAxis {
            axis,
            ndim: self.ndim(),
        })
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        if self.dims.is_empty() {
            1 // scalar
        } else {
            self.dims.iter().product()
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.dims.clone()
    }

    /// Compute row-major (C-order) strides.
    pub fn strides(&self) -> Vec<usize> {
        if self.dims.is_empty() {
            return vec![];
        }
        let mut strides = vec![1usize; self.dims.len()];
        for i in (0..self.dims.len() - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Number of elements in one slice along axis 0.
    ///
    /// For a batch shape `[n, h, w, c]` this is `h * w * c`.
    pub fn sample_numel(&self) -> usize {
        self.dims.iter().skip(1).product()
    }

    /// The shape with its leading dimension replaced by `n`.
    pub fn with_leading(&self, n: usize) -> TensorResult<Shape> {
        if self.dims.is_empty() {
            return Err(TensorError::InvalidAxis { axis: 0, ndim: 0 });
        }
        let mut dims = self.dims.clone();
        dims[0] = n;
        Ok(Shape::new(dims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(vec![4, 8, 8, 3]);
        assert_eq!(s.ndim(), 4);
        assert_eq!(s.numel(), 768);
        assert_eq!(s.dim(0).unwrap(), 4);
        assert_eq!(s.dim(3).unwrap(), 3);
        assert!(s.dim(4).is_err());
        assert_eq!(s.sample_numel(), 192);
    }

    #[test]
    fn test_strides() {
        let s = Shape::new(vec![2, 4, 4, 3]);
        assert_eq!(s.strides(), vec![48, 12, 3, 1]);
    }

    #[test]
    fn test_with_leading() {
        let s = Shape::new(vec![5, 17]);
        assert_eq!(s.with_leading(12).unwrap().dims(), &[12, 17]);
        assert!(Shape::new(vec![]).with_leading(1).is_err());
    }
}
