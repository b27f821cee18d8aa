//! Metrics for segmentation training.

mod accuracy;
mod input;

pub use accuracy::{calculate_pixel_accuracy, PixelAccuracyMetric, PixelAccuracyMetricConfig};
pub use input::PixelAccuracyInput;
