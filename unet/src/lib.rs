//! Parametric UNet encoder-decoder for image segmentation using Burn.
//!
//! The `train` feature (enabled by default) adds the dataset pipeline,
//! augmentation transforms, metrics, and Learner integration on top of the
//! bare model.

mod config;
mod error;
mod losses;
mod models;

#[cfg(feature = "train")]
mod dataset;
#[cfg(feature = "train")]
mod metrics;
#[cfg(feature = "train")]
mod training;
#[cfg(feature = "train")]
mod transforms;

pub use config::PipelineConfig;
pub use error::{UNetError, UNetResult};
pub use losses::{BCELoss, BCELossConfig};
pub use models::{ConvBlock, ConvBlockConfig, UNet, UNetConfig};

#[cfg(feature = "train")]
pub use dataset::{
    collect_pairs, load_image_mask_pairs, normalize, RawPair, SegmentationBatch,
    SegmentationBatcher, SegmentationDataset, SegmentationItem,
};
#[cfg(feature = "train")]
pub use metrics::{
    calculate_pixel_accuracy, PixelAccuracyInput, PixelAccuracyMetric, PixelAccuracyMetricConfig,
};
#[cfg(feature = "train")]
pub use training::SegmentationOutput;
#[cfg(feature = "train")]
pub use transforms::{GaussianNoise, RandomAxisFlip, RandomCrop, Transform};
