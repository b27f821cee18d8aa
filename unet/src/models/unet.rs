//! Parametric UNet encoder-decoder.
//!
//! The network is built from a depth parameter and an initial feature width:
//! every encoder level doubles the channel width and halves the spatial
//! resolution (by `pooling_size`), the decoder mirrors it with learned
//! transposed-convolution upsampling, and each decoder level concatenates
//! the skip cached by its matching encoder level before convolving.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::activation::softmax,
};

use crate::{
    error::{UNetError, UNetResult},
    losses::{BCELoss, BCELossConfig},
};

#[cfg(feature = "train")]
use crate::{dataset::SegmentationBatch, training::SegmentationOutput};
#[cfg(feature = "train")]
use burn::{
    tensor::backend::AutodiffBackend,
    train::{TrainOutput, TrainStep, ValidStep},
};

/// Configuration for a stack of same-padded convolutions with ReLU.
#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = "2")]
    n_blocks: usize,
    #[config(default = "3")]
    kernel_size: usize,
}

impl ConvBlockConfig {
    /// Initializes a `ConvBlock` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ConvBlock<B> {
        let padding = (self.kernel_size - 1) / 2;
        let convs = (0..self.n_blocks)
            .map(|i| {
                let in_channels = if i == 0 {
                    self.in_channels
                } else {
                    self.out_channels
                };
                Conv2dConfig::new(
                    [in_channels, self.out_channels],
                    [self.kernel_size, self.kernel_size],
                )
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .init(device)
            })
            .collect();

        ConvBlock {
            convs,
            relu: Relu::new(),
        }
    }
}

/// A stack of `n_blocks` same-padded convolutions, each followed by ReLU.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    convs: Vec<Conv2d<B>>,
    relu: Relu,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = x;
        for conv in &self.convs {
            x = self.relu.forward(conv.forward(x));
        }
        x
    }
}

/// Configuration for the `UNet` model.
#[derive(Config, Debug)]
pub struct UNetConfig {
    /// Number of input image channels.
    pub in_channels: usize,
    /// Number of output classes. One class yields a sigmoid head, more than
    /// one a softmax head.
    pub out_channels: usize,
    /// Network depth. Level `n_levels - 1` is the bottleneck.
    #[config(default = "4")]
    pub n_levels: usize,
    /// Channel width at level 0; level `l` uses `initial_features * 2^l`.
    #[config(default = "32")]
    pub initial_features: usize,
    /// Convolutions per level.
    #[config(default = "2")]
    pub n_blocks: usize,
    /// Convolution kernel size. Must be odd so same-padding preserves shape.
    #[config(default = "3")]
    pub kernel_size: usize,
    /// Downsampling factor between levels.
    #[config(default = "2")]
    pub pooling_size: usize,
}

impl UNetConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> UNetResult<()> {
        if self.n_levels == 0 {
            return Err(UNetError::InvalidConfiguration {
                reason: "Number of levels must be at least 1".to_string(),
            });
        }
        if self.initial_features == 0 || self.n_blocks == 0 {
            return Err(UNetError::InvalidConfiguration {
                reason: "Feature width and blocks per level must be at least 1".to_string(),
            });
        }
        if self.kernel_size % 2 == 0 {
            return Err(UNetError::InvalidConfiguration {
                reason: format!(
                    "Kernel size must be odd for shape-preserving padding, got {}",
                    self.kernel_size
                ),
            });
        }
        if self.n_levels > 1 && self.pooling_size < 2 {
            return Err(UNetError::InvalidConfiguration {
                reason: format!(
                    "Pooling size must be at least 2 for a multi-level network, got {}",
                    self.pooling_size
                ),
            });
        }
        Ok(())
    }

    /// Initializes a `UNet` model.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> UNetResult<UNet<B>> {
        self.validate()?;

        let features = |level: usize| self.initial_features << level;
        let pooling = [self.pooling_size, self.pooling_size];

        let mut encoders = Vec::with_capacity(self.n_levels - 1);
        let mut in_channels = self.in_channels;
        for level in 0..self.n_levels - 1 {
            encoders.push(
                ConvBlockConfig::new(in_channels, features(level))
                    .with_n_blocks(self.n_blocks)
                    .with_kernel_size(self.kernel_size)
                    .init(device),
            );
            in_channels = features(level);
        }

        let bottleneck = ConvBlockConfig::new(in_channels, features(self.n_levels - 1))
            .with_n_blocks(self.n_blocks)
            .with_kernel_size(self.kernel_size)
            .init(device);

        // Decoder levels are stored deepest-first, matching the order in
        // which cached skips are consumed.
        let mut upsamplers = Vec::with_capacity(self.n_levels - 1);
        let mut decoders = Vec::with_capacity(self.n_levels - 1);
        for level in (0..self.n_levels - 1).rev() {
            upsamplers.push(
                ConvTranspose2dConfig::new([features(level + 1), features(level)], pooling)
                    .with_stride(pooling)
                    .init(device),
            );
            decoders.push(
                ConvBlockConfig::new(features(level) * 2, features(level))
                    .with_n_blocks(self.n_blocks)
                    .with_kernel_size(self.kernel_size)
                    .init(device),
            );
        }

        let head = Conv2dConfig::new([self.initial_features, self.out_channels], [1, 1])
            .init(device);

        Ok(UNet {
            encoders,
            pool: MaxPool2dConfig::new(pooling).with_strides(pooling).init(),
            bottleneck,
            upsamplers,
            decoders,
            head,
            loss: BCELossConfig::new().init(),
            out_channels: self.out_channels,
        })
    }
}

/// Symmetric encoder-decoder convolutional network with skip connections.
#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    encoders: Vec<ConvBlock<B>>,
    pool: MaxPool2d,
    bottleneck: ConvBlock<B>,
    upsamplers: Vec<ConvTranspose2d<B>>,
    decoders: Vec<ConvBlock<B>>,
    head: Conv2d<B>,
    loss: BCELoss<B>,
    out_channels: usize,
}

impl<B: Backend> UNet<B> {
    /// The forward pass, producing per-pixel class probabilities at the
    /// input's spatial resolution.
    ///
    /// The input spatial size must be divisible by
    /// `pooling_size^(n_levels - 1)`, otherwise an upsampled decoder level
    /// no longer matches its cached skip and concatenation fails with a
    /// shape-mismatch panic.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut skips = Vec::with_capacity(self.encoders.len());

        let mut x = x;
        for encoder in &self.encoders {
            let features = encoder.forward(x);
            skips.push(features.clone());
            x = self.pool.forward(features);
        }

        x = self.bottleneck.forward(x);

        for (upsample, decoder) in self.upsamplers.iter().zip(self.decoders.iter()) {
            let skip = skips.pop().unwrap_or_else(|| {
                panic!("One cached skip per decoder level; this is a construction bug")
            });
            x = upsample.forward(x);
            x = Tensor::cat(vec![skip, x], 1);
            x = decoder.forward(x);
        }

        let logits = self.head.forward(x);
        if self.out_channels == 1 {
            burn::tensor::activation::sigmoid(logits)
        } else {
            softmax(logits, 1)
        }
    }

    /// Forward pass for training and validation.
    #[cfg(feature = "train")]
    pub fn forward_segmentation(&self, batch: SegmentationBatch<B>) -> SegmentationOutput<B> {
        let output = self.forward(batch.images);
        let loss = self.loss.forward(output.clone(), batch.masks.clone());

        SegmentationOutput {
            loss,
            output,
            targets: batch.masks,
        }
    }
}

#[cfg(feature = "train")]
impl<B: AutodiffBackend> TrainStep<SegmentationBatch<B>, SegmentationOutput<B>> for UNet<B> {
    fn step(&self, batch: SegmentationBatch<B>) -> TrainOutput<SegmentationOutput<B>> {
        let item = self.forward_segmentation(batch);
        TrainOutput::new(self, item.loss.backward(), item)
    }
}

#[cfg(feature = "train")]
impl<B: Backend> ValidStep<SegmentationBatch<B>, SegmentationOutput<B>> for UNet<B> {
    fn step(&self, batch: SegmentationBatch<B>) -> SegmentationOutput<B> {
        self.forward_segmentation(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray;

    fn device() -> Device<TestBackend> {
        Default::default()
    }

    #[test]
    fn single_level_network_has_no_skips() {
        let model = UNetConfig::new(1, 1)
            .with_n_levels(1)
            .with_initial_features(4)
            .init::<TestBackend>(&device())
            .unwrap();

        assert!(model.encoders.is_empty());
        assert!(model.upsamplers.is_empty());
        assert!(model.decoders.is_empty());

        let input = Tensor::zeros([1, 1, 8, 8], &device());
        assert_eq!(model.forward(input).dims(), [1, 1, 8, 8]);
    }

    #[test]
    fn skip_count_matches_depth() {
        let model = UNetConfig::new(1, 1)
            .with_n_levels(3)
            .with_initial_features(2)
            .init::<TestBackend>(&device())
            .unwrap();

        assert_eq!(model.encoders.len(), 2);
        assert_eq!(model.upsamplers.len(), 2);
        assert_eq!(model.decoders.len(), 2);
    }

    #[test]
    fn forward_preserves_spatial_shape() {
        let model = UNetConfig::new(1, 1)
            .with_n_levels(3)
            .with_initial_features(32)
            .init::<TestBackend>(&device())
            .unwrap();

        let input = Tensor::zeros([1, 1, 128, 128], &device());
        let output = model.forward(input);
        assert_eq!(output.dims(), [1, 1, 128, 128]);

        // Sigmoid head: probabilities in [0, 1].
        let values = output.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn multi_class_head_uses_softmax() {
        let model = UNetConfig::new(1, 3)
            .with_n_levels(1)
            .with_initial_features(4)
            .init::<TestBackend>(&device())
            .unwrap();

        let input =
            Tensor::random([2, 1, 4, 4], burn::tensor::Distribution::Default, &device());
        let output = model.forward(input);
        assert_eq!(output.dims(), [2, 3, 4, 4]);

        // Class probabilities sum to one per pixel.
        let sums = output.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
    }

    #[test]
    fn saved_model_restores_through_the_file_recorder() {
        use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

        let device = device();
        let config = UNetConfig::new(1, 1)
            .with_n_levels(2)
            .with_initial_features(4);
        let model = config.init::<TestBackend>(&device).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mpk");
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        model.clone().save_file(&path, &recorder).unwrap();

        let restored = config
            .init::<TestBackend>(&device)
            .unwrap()
            .load_file(&path, &recorder, &device)
            .unwrap();

        let input =
            Tensor::random([1, 1, 8, 8], burn::tensor::Distribution::Default, &device);
        let expected = model.forward(input.clone()).into_data().to_vec::<f32>().unwrap();
        let actual = restored.forward(input).into_data().to_vec::<f32>().unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn even_kernel_is_rejected() {
        let config = UNetConfig::new(1, 1).with_kernel_size(4);
        match config.init::<TestBackend>(&device()) {
            Err(UNetError::InvalidConfiguration { reason }) => {
                assert!(reason.contains("odd"));
            }
            _ => panic!("Expected InvalidConfiguration error"),
        }
    }

    #[test]
    fn zero_levels_are_rejected() {
        let config = UNetConfig::new(1, 1).with_n_levels(0);
        assert!(config.validate().is_err());
    }
}
