//! Additional operations for the Burn deep learning framework
//!
//! This crate provides operations that are commonly used in deep learning but are not
//! yet available in the core Burn framework.

use burn::prelude::*;

mod bilinear;

// Convenient re-exports
pub use bilinear::{bilinear_sample, CornerWeights};

/// Additional operations for Burn tensors
pub trait TensorExtraOps<B: Backend> {
    /// Resample the tensor at real-valued `(rows, cols)` coordinates with
    /// bilinear interpolation and replicate-border lookups.
    fn sample_bilinear(self, rows: Tensor<B, 3>, cols: Tensor<B, 3>) -> Self;
}

impl<B: Backend> TensorExtraOps<B> for Tensor<B, 4> {
    fn sample_bilinear(self, rows: Tensor<B, 3>, cols: Tensor<B, 3>) -> Self {
        bilinear_sample(self, rows, cols)
    }
}
