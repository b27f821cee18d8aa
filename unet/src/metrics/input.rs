//! Input structures for segmentation metrics.

use burn::{prelude::*, tensor::backend::Backend};

pub struct PixelAccuracyInput<B: Backend> {
    pub predictions: Tensor<B, 4>,
    pub targets: Tensor<B, 4>,
}

impl<B: Backend> PixelAccuracyInput<B> {
    pub const fn new(predictions: Tensor<B, 4>, targets: Tensor<B, 4>) -> Self {
        Self {
            predictions,
            targets,
        }
    }
}
