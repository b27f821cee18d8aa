//! Training glue for the UNet model.
//!
//! Implements the output structure shared by `TrainStep` and `ValidStep`
//! together with the metric adaptors that feed Burn's Learner.

use crate::metrics::PixelAccuracyInput;
use burn::{
    prelude::*,
    tensor::{backend::Backend, Transaction},
    train::metric::{Adaptor, ItemLazy, LossInput},
};

/// Output of one training or validation step.
#[derive(Debug, Clone)]
pub struct SegmentationOutput<B: Backend> {
    /// The computed loss.
    pub loss: Tensor<B, 1>,
    /// Predicted per-pixel probabilities.
    pub output: Tensor<B, 4>,
    /// Ground-truth binary masks.
    pub targets: Tensor<B, 4>,
}

impl<B: Backend> ItemLazy for SegmentationOutput<B> {
    type ItemSync = Self;

    fn sync(self) -> Self::ItemSync {
        let transaction = Transaction::default()
            .register(self.loss)
            .register(self.output)
            .register(self.targets)
            .execute();

        let [loss, output, targets] = transaction.try_into().unwrap_or_else(|_| {
            panic!(
                "Failed to extract exactly 3 tensors from transaction. \
                 Expected: [loss, output, targets]."
            )
        });

        let device = &Default::default();

        Self {
            loss: Tensor::from_data(loss, device),
            output: Tensor::from_data(output, device),
            targets: Tensor::from_data(targets, device),
        }
    }
}

impl<B: Backend> Adaptor<PixelAccuracyInput<B>> for SegmentationOutput<B> {
    fn adapt(&self) -> PixelAccuracyInput<B> {
        PixelAccuracyInput::new(self.output.clone(), self.targets.clone())
    }
}

impl<B: Backend> Adaptor<LossInput<B>> for SegmentationOutput<B> {
    fn adapt(&self) -> LossInput<B> {
        LossInput::new(self.loss.clone())
    }
}
