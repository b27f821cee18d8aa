//! Pipeline configuration for the segmentation dataset.

use burn::prelude::*;

use crate::error::{UNetError, UNetResult};

/// Configuration of the input pipeline.
///
/// Fixed once the dataset is built: the dataset applies normalization,
/// repeated random cropping, and the configured transforms in that order,
/// while batching, shuffling, and prefetching are handled by the Burn
/// data loader built on top of it.
#[derive(Config, Debug)]
pub struct PipelineConfig {
    /// Spatial size `[height, width]` of the random patch cropped from every
    /// example. `None` feeds the full image through.
    #[config(default = "None")]
    pub patch_size: Option<[usize; 2]>,
    /// How many random patches to draw from each source image per epoch.
    #[config(default = "1")]
    pub patches_per_image: usize,
    /// Number of examples per batch.
    #[config(default = "4")]
    pub batch_size: usize,
    /// Base seed for shuffling and per-item augmentation draws.
    #[config(default = "42")]
    pub seed: u64,
}

impl PipelineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> UNetResult<()> {
        if self.batch_size == 0 {
            return Err(UNetError::InvalidConfiguration {
                reason: "Batch size must be greater than 0".to_string(),
            });
        }
        if self.patches_per_image == 0 {
            return Err(UNetError::InvalidConfiguration {
                reason: "Patches per image must be greater than 0".to_string(),
            });
        }
        if let Some([h, w]) = self.patch_size {
            if h == 0 || w == 0 {
                return Err(UNetError::InvalidConfiguration {
                    reason: format!("Patch size must be non-zero, got [{h}, {w}]"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        assert!(PipelineConfig::new().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = PipelineConfig::new().with_batch_size(0);
        match config.validate() {
            Err(UNetError::InvalidConfiguration { reason }) => {
                assert!(reason.contains("Batch size"));
            }
            _ => panic!("Expected InvalidConfiguration error"),
        }
    }

    #[test]
    fn empty_patch_is_rejected() {
        let config = PipelineConfig::new().with_patch_size(Some([0, 64]));
        assert!(config.validate().is_err());
    }
}
