//! Per-pixel accuracy metric.
//!
//! Thresholds the predicted probabilities and counts the fraction of pixels
//! that agree with the binarized target mask, accumulated over an epoch.

use burn::{
    prelude::*,
    tensor::{backend::Backend, ElementConversion, Tensor},
    train::metric::{Metric, MetricEntry, MetricMetadata, Numeric},
};
use std::marker::PhantomData;

use crate::metrics::input::PixelAccuracyInput;

#[derive(Config, Debug)]
pub struct PixelAccuracyMetricConfig {
    #[config(default = 0.5)]
    pub threshold: f32,
}

#[derive(Debug, Clone)]
pub struct PixelAccuracyMetric<B: Backend> {
    state: PixelAccuracyState<B>,
    threshold: f32,
}

#[derive(Debug, Clone, Default)]
struct PixelAccuracyState<B: Backend> {
    sum_correct: f64,
    sum_pixels: f64,
    _b: PhantomData<B>,
}

impl PixelAccuracyMetricConfig {
    pub fn init<B: Backend>(&self) -> PixelAccuracyMetric<B> {
        PixelAccuracyMetric {
            state: PixelAccuracyState::default(),
            threshold: self.threshold,
        }
    }
}

impl<B: Backend> Default for PixelAccuracyMetric<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> PixelAccuracyMetric<B> {
    pub fn new() -> Self {
        PixelAccuracyMetricConfig::new().init()
    }

    fn update_stats(&mut self, predictions: Tensor<B, 4>, targets: Tensor<B, 4>) {
        // Predictions are probabilities already; no sigmoid here.
        let preds_binary = predictions.greater_elem(self.threshold).int();
        let targets_binary = targets.greater_elem(0.5).int();

        let total = preds_binary.dims().iter().product::<usize>() as f64;
        let correct = preds_binary
            .equal(targets_binary)
            .int()
            .sum()
            .into_scalar()
            .elem::<f64>();

        self.state.sum_correct += correct;
        self.state.sum_pixels += total;
    }

    fn accuracy_value(&self) -> f64 {
        if self.state.sum_pixels == 0.0 {
            return 0.0;
        }
        self.state.sum_correct / self.state.sum_pixels
    }
}

impl<B: Backend> Metric for PixelAccuracyMetric<B> {
    type Input = PixelAccuracyInput<B>;

    fn name(&self) -> String {
        "Pixel Accuracy".to_string()
    }

    fn update(&mut self, item: &Self::Input, _metadata: &MetricMetadata) -> MetricEntry {
        self.update_stats(item.predictions.clone(), item.targets.clone());
        let value = self.accuracy_value();
        MetricEntry::new(self.name(), format!("{value:.5}"), format!("{value:.5}"))
    }

    fn clear(&mut self) {
        self.state = PixelAccuracyState::default();
    }
}

impl<B: Backend> Numeric for PixelAccuracyMetric<B> {
    fn value(&self) -> f64 {
        self.accuracy_value()
    }
}

/// Calculate pixel accuracy for one prediction/target pair.
pub fn calculate_pixel_accuracy<B: Backend>(
    predictions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    threshold: f32,
) -> f64 {
    let mut metric = PixelAccuracyMetricConfig::new()
        .with_threshold(threshold)
        .init();
    metric.update_stats(predictions, targets);
    metric.accuracy_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn perfect_match_scores_one() {
        let device = Default::default();
        let targets = Tensor::<TestBackend, 4>::from_floats([[[[0.0, 1.0], [1.0, 0.0]]]], &device);
        let predictions =
            Tensor::<TestBackend, 4>::from_floats([[[[0.1, 0.9], [0.8, 0.2]]]], &device);

        let accuracy = calculate_pixel_accuracy(predictions, targets, 0.5);
        assert!((accuracy - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn half_match_scores_half() {
        let device = Default::default();
        let targets = Tensor::<TestBackend, 4>::from_floats([[[[0.0, 1.0], [1.0, 0.0]]]], &device);
        let predictions =
            Tensor::<TestBackend, 4>::from_floats([[[[0.9, 0.9], [0.2, 0.2]]]], &device);

        let accuracy = calculate_pixel_accuracy(predictions, targets, 0.5);
        assert!((accuracy - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn metric_accumulates_across_updates() {
        let device = Default::default();
        let mut metric = PixelAccuracyMetric::<TestBackend>::new();

        let targets = Tensor::<TestBackend, 4>::from_floats([[[[1.0, 1.0]]]], &device);
        let right = Tensor::<TestBackend, 4>::from_floats([[[[0.9, 0.9]]]], &device);
        let wrong = Tensor::<TestBackend, 4>::from_floats([[[[0.1, 0.1]]]], &device);

        metric.update_stats(right, targets.clone());
        metric.update_stats(wrong, targets);

        assert!((metric.value() - 0.5).abs() < f64::EPSILON);

        metric.clear();
        assert_eq!(metric.value(), 0.0);
    }
}
