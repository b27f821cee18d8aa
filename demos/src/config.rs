//! Configuration for the UNet demos.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use unet_burn::{PipelineConfig, UNetConfig};

/// Optimizer selection for training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Adam,
    AdamW,
}

/// Configuration for the training demo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Model configuration.
    pub model: UNetConfig,
    /// Input pipeline configuration.
    pub pipeline: PipelineConfig,
    /// Optimizer to train with.
    pub optimizer: OptimizerKind,
    /// Number of training epochs.
    pub num_epochs: usize,
    /// Learning rate for optimization.
    pub learning_rate: f64,
    /// Root folder of the training dataset.
    pub train_root: PathBuf,
    /// Root folder of the validation dataset.
    pub val_root: PathBuf,
    /// Subfolder holding the raw images.
    pub raw_subdir: String,
    /// Subfolder holding the masks.
    pub mask_subdir: String,
    /// Shell-style filename pattern matched in both subfolders.
    pub pattern: String,
    /// Probability of the horizontal flip augmentation. Zero disables it.
    pub flip_prob: f64,
    /// Mean of the per-call noise standard deviation draw. Zero or negative
    /// disables the noise augmentation.
    pub noise_mu: f64,
    /// Spread of the per-call noise standard deviation draw.
    pub noise_sigma: f64,
    /// Directory for checkpoints, metric logs, and the final model.
    pub artifact_dir: PathBuf,
    /// Number of workers for data loading.
    pub num_workers: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: UNetConfig::new(1, 1),
            pipeline: PipelineConfig::new()
                .with_patch_size(Some([256, 256]))
                .with_patches_per_image(4),
            optimizer: OptimizerKind::Adam,
            num_epochs: 25,
            learning_rate: 1e-4,
            train_root: PathBuf::from("datasets/train"),
            val_root: PathBuf::from("datasets/val"),
            raw_subdir: "raw".to_string(),
            mask_subdir: "mask".to_string(),
            pattern: "*.png".to_string(),
            flip_prob: 0.5,
            noise_mu: 0.1,
            noise_sigma: 0.05,
            artifact_dir: PathBuf::from("artifacts"),
            num_workers: 4,
        }
    }
}

/// Configuration for the inference demo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Output directory for predicted masks.
    pub output_path: PathBuf,
    /// Threshold for a binary mask (`None` keeps the soft probability map).
    pub threshold: Option<f32>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("outputs"),
            threshold: None,
        }
    }
}
