use burn::{
    prelude::*,
    tensor::{backend::Backend, Tensor},
};

/// Binary cross-entropy over probabilities.
///
/// Expects inputs already squashed into [0, 1] (the UNet head applies
/// sigmoid), so no logit rescaling happens here.
#[derive(Module, Debug)]
pub struct BCELoss<B: Backend> {
    epsilon: f64,
    _phantom: std::marker::PhantomData<B>,
}

#[derive(Config, Debug)]
pub struct BCELossConfig {
    /// Probabilities are clamped into `[epsilon, 1 - epsilon]` before the
    /// log terms, keeping the loss finite at saturation.
    #[config(default = "1e-8")]
    pub epsilon: f64,
}

impl BCELossConfig {
    pub const fn init<B: Backend>(&self) -> BCELoss<B> {
        BCELoss {
            epsilon: self.epsilon,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<B: Backend> BCELoss<B> {
    /// Mean binary cross-entropy between `input` probabilities and `target`
    /// labels in [0, 1].
    pub fn forward<const D: usize>(
        &self,
        input: Tensor<B, D>,
        target: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        self.assertions(&input, &target);

        // Pull saturated probabilities off {0, 1} so neither log term
        // produces -inf.
        let input = input.clamp(self.epsilon, 1.0 - self.epsilon);

        let log_input = input.clone().log();
        let log_one_minus_input = (Tensor::ones_like(&input) - input).log();

        // L = -(y * log(x) + (1 - y) * log(1 - x))
        let one = Tensor::ones_like(&target);
        let loss = -(target.clone() * log_input + (one - target) * log_one_minus_input);

        loss.mean()
    }

    fn assertions<const D: usize>(&self, input: &Tensor<B, D>, target: &Tensor<B, D>) {
        assert_eq!(
            input.shape(),
            target.shape(),
            "Input and target must have the same shape. Got input: {:?}, target: {:?}",
            input.shape(),
            target.shape()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn perfect_prediction_has_near_zero_loss() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 1.0, 0.0], &device);
        let input = Tensor::<TestBackend, 1>::from_floats([0.001, 0.999, 0.999, 0.001], &device);

        let loss = BCELossConfig::new()
            .init::<TestBackend>()
            .forward(input, target)
            .into_scalar();
        assert!(loss < 0.01, "loss was {loss}");
    }

    #[test]
    fn uniform_prediction_matches_ln_two() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0], &device);
        let input = Tensor::<TestBackend, 1>::from_floats([0.5, 0.5], &device);

        let loss = BCELossConfig::new()
            .init::<TestBackend>()
            .forward(input, target)
            .into_scalar();
        assert!((loss - core::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn saturated_prediction_stays_finite() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1>::from_floats([1.0], &device);
        let input = Tensor::<TestBackend, 1>::from_floats([0.0], &device);

        let loss = BCELossConfig::new()
            .init::<TestBackend>()
            .forward(input, target)
            .into_scalar();
        assert!(loss.is_finite());
    }
}
