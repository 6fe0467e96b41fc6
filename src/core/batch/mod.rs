//! Batch processing utilities for the detection pipeline.
//!
//! This module provides the batch tensor alias used across the crate, a sampler
//! that chunks ordered work into fixed-size batches, and the conversion that
//! stacks per-tile CHW tensors into a single NCHW batch tensor.

use crate::core::OCRError;
use ndarray::{Array3, Axis};

/// A 4-dimensional tensor represented as a 4D array of f32 values.
pub type Tensor4D = ndarray::Array4<f32>;

/// A sampler that splits an ordered slice into consecutive batches.
///
/// Every batch holds exactly `batch_size` items except possibly the last,
/// which holds the remainder. Order is preserved.
#[derive(Debug, Clone, Copy)]
pub struct BatchSampler {
    /// The size of each batch.
    batch_size: usize,
}

impl BatchSampler {
    /// Creates a new BatchSampler with the specified batch size.
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Returns the batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Creates an iterator over batches of data.
    ///
    /// A zero batch size yields no batches.
    pub fn batches<'a, T>(&self, data: &'a [T]) -> impl Iterator<Item = &'a [T]> {
        if self.batch_size == 0 {
            data.chunks(1).take(0)
        } else {
            data.chunks(self.batch_size).take(usize::MAX)
        }
    }

    /// Returns how many batches [`BatchSampler::batches`] yields for `len` items.
    pub fn num_batches(&self, len: usize) -> usize {
        if self.batch_size == 0 {
            0
        } else {
            len.div_ceil(self.batch_size)
        }
    }
}

/// Stacks equally shaped CHW tensors into one NCHW batch tensor.
///
/// # Errors
///
/// Returns [`OCRError::InvalidInput`] when the slice is empty, when shapes
/// differ, or when the stacked tensor would exceed
/// [`MAX_TENSOR_SIZE`](crate::core::constants::MAX_TENSOR_SIZE) elements.
pub fn stack_chw(tensors: &[&Array3<f32>]) -> Result<Tensor4D, OCRError> {
    let first = tensors.first().ok_or_else(|| OCRError::InvalidInput {
        message: "cannot build a batch from zero tensors".to_string(),
    })?;
    let shape = first.shape().to_vec();

    for (i, tensor) in tensors.iter().enumerate().skip(1) {
        if tensor.shape() != shape.as_slice() {
            return Err(OCRError::InvalidInput {
                message: format!(
                    "All tensors in a batch must share a shape: tensor 0 is {:?}, tensor {} is {:?}",
                    shape,
                    i,
                    tensor.shape()
                ),
            });
        }
    }

    let total = tensors.len() * shape.iter().product::<usize>();
    if total > crate::core::constants::MAX_TENSOR_SIZE {
        return Err(OCRError::InvalidInput {
            message: format!(
                "Batch tensor size {} exceeds maximum allowed size {}",
                total,
                crate::core::constants::MAX_TENSOR_SIZE
            ),
        });
    }

    let views: Vec<_> = tensors.iter().map(|t| t.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(OCRError::Tensor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_keep_order_and_remainder() {
        let sampler = BatchSampler::new(3);
        let data: Vec<usize> = (0..7).collect();
        let batches: Vec<&[usize]> = sampler.batches(&data).collect();
        assert_eq!(batches, vec![&[0, 1, 2][..], &[3, 4, 5][..], &[6][..]]);
        assert_eq!(sampler.num_batches(data.len()), 3);
    }

    #[test]
    fn test_zero_batch_size_yields_nothing() {
        let sampler = BatchSampler::new(0);
        let data = [1, 2, 3];
        assert_eq!(sampler.batches(&data).count(), 0);
        assert_eq!(sampler.num_batches(3), 0);
    }

    #[test]
    fn test_stack_chw_builds_nchw() {
        let a = Array3::<f32>::zeros((3, 4, 5));
        let b = Array3::<f32>::ones((3, 4, 5));
        let batch = stack_chw(&[&a, &b]).unwrap();
        assert_eq!(batch.shape(), &[2, 3, 4, 5]);
        assert_eq!(batch[[1, 2, 3, 4]], 1.0);
    }

    #[test]
    fn test_stack_chw_rejects_mismatched_shapes() {
        let a = Array3::<f32>::zeros((3, 4, 5));
        let b = Array3::<f32>::zeros((3, 4, 6));
        assert!(stack_chw(&[&a, &b]).is_err());
        assert!(stack_chw(&[]).is_err());
    }
}
