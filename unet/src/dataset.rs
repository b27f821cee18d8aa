//! Dataset implementation for UNet training and inference.
//!
//! This module pairs raw intensity images with their segmentation masks by
//! filename, decodes every pair into memory up front, and exposes the
//! result as a Burn [`Dataset`] that applies normalization, repeated random
//! cropping, and the configured augmentation transforms per item. Shuffling,
//! batching, and prefetching are left to Burn's `DataLoaderBuilder` on top.

use std::path::{Path, PathBuf};

use burn::data::{dataloader::batcher::Batcher, dataset::Dataset};
use burn::tensor::{backend::Backend, Tensor, TensorData};

use glob::Pattern;
use rand::{rngs::StdRng, SeedableRng};
use walkdir::WalkDir;

use crate::{
    config::PipelineConfig,
    error::{UNetError, UNetResult},
    transforms::{RandomCrop, Transform},
};

/// A single decoded raw/mask pair held in memory.
///
/// The image keeps its raw 0..255 intensity scale; normalization happens in
/// the pipeline. The mask is binarized at decode time (any value >= 1 maps
/// to 1.0).
#[derive(Debug, Clone)]
pub struct RawPair {
    /// Row-major raw image intensities, one channel.
    pub image: Vec<f32>,
    /// Row-major binary mask values, one channel.
    pub mask: Vec<f32>,
    /// Spatial height shared by image and mask.
    pub height: usize,
    /// Spatial width shared by image and mask.
    pub width: usize,
}

/// A single preprocessed example: image and mask tensors of shape `[C, H, W]`.
#[derive(Debug, Clone)]
pub struct SegmentationItem<B: Backend> {
    /// Normalized input image tensor, C=1.
    pub image: Tensor<B, 3>,
    /// Binary segmentation mask tensor, C=1.
    pub mask: Tensor<B, 3>,
}

/// A batch of examples stacked into `[B, C, H, W]` tensors.
#[derive(Debug, Clone)]
pub struct SegmentationBatch<B: Backend> {
    /// Batched input images.
    pub images: Tensor<B, 4>,
    /// Batched segmentation masks.
    pub masks: Tensor<B, 4>,
}

/// Batcher converting a vector of items into a [`SegmentationBatch`].
#[derive(Clone, Default)]
pub struct SegmentationBatcher<B: Backend> {
    _phantom: std::marker::PhantomData<B>,
}

impl<B: Backend> SegmentationBatcher<B> {
    /// Create a new batcher.
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<B: Backend> Batcher<B, SegmentationItem<B>, SegmentationBatch<B>> for SegmentationBatcher<B> {
    fn batch(&self, items: Vec<SegmentationItem<B>>, _device: &B::Device) -> SegmentationBatch<B> {
        let mut images = Vec::with_capacity(items.len());
        let mut masks = Vec::with_capacity(items.len());

        for item in items {
            images.push(item.image);
            masks.push(item.mask);
        }

        SegmentationBatch {
            images: Tensor::stack(images, 0),
            masks: Tensor::stack(masks, 0),
        }
    }
}

/// Find filenames present in both subdirectories that match the shell-style
/// glob pattern, returning the raw/mask path pairs sorted by filename.
///
/// # Errors
///
/// Fails if either directory is missing, the pattern is malformed, or no
/// pair matches.
pub fn collect_pairs(
    root: &Path,
    raw_subdir: &str,
    mask_subdir: &str,
    pattern: &str,
) -> UNetResult<Vec<(PathBuf, PathBuf)>> {
    let raw_root = root.join(raw_subdir);
    let mask_root = root.join(mask_subdir);

    if !raw_root.exists() {
        return Err(UNetError::Dataset {
            message: format!("Image directory does not exist: {}", raw_root.display()),
        });
    }
    if !mask_root.exists() {
        return Err(UNetError::Dataset {
            message: format!("Mask directory does not exist: {}", mask_root.display()),
        });
    }

    let pattern = Pattern::new(pattern).map_err(|e| UNetError::InvalidConfiguration {
        reason: format!("Invalid filename pattern '{pattern}': {e}"),
    })?;

    let mut items = Vec::new();
    for entry in WalkDir::new(&raw_root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| UNetError::Dataset {
            message: format!("Failed to read directory entry: {e}"),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let image_path = entry.into_path();
        let Some(file_name) = image_path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !pattern.matches(file_name) {
            continue;
        }

        // Pairing is by identical filename across the two subdirectories.
        let mask_path = mask_root.join(file_name);
        if mask_path.is_file() {
            items.push((image_path, mask_path));
        } else {
            eprintln!("Warning: No mask found for image: {}", image_path.display());
        }
    }

    if items.is_empty() {
        return Err(UNetError::Dataset {
            message: format!(
                "No image/mask pairs matching '{}' found in {}",
                pattern, raw_root.display()
            ),
        });
    }

    items.sort();
    Ok(items)
}

/// Decode every matching raw/mask pair into memory.
///
/// Images decode to single-channel f32 at the raw 0..255 scale; masks are
/// binarized with threshold >= 1. A pair whose shapes disagree or a file
/// that fails to decode aborts loading with an error.
pub fn load_image_mask_pairs(
    root: &Path,
    raw_subdir: &str,
    mask_subdir: &str,
    pattern: &str,
) -> UNetResult<Vec<RawPair>> {
    let items = collect_pairs(root, raw_subdir, mask_subdir, pattern)?;
    let mut pairs = Vec::with_capacity(items.len());

    for (image_path, mask_path) in items {
        let image = decode_luma(&image_path)?;
        let mask = decode_luma(&mask_path)?;

        if image.1 != mask.1 || image.2 != mask.2 {
            return Err(UNetError::InvalidTensorShape {
                expected: format!("mask of size {}x{}", image.2, image.1),
                actual: format!("{}x{}", mask.2, mask.1),
            });
        }

        let (image, height, width) = image;
        let mask = mask
            .0
            .into_iter()
            .map(|v| if v >= 1.0 { 1.0 } else { 0.0 })
            .collect();

        pairs.push(RawPair {
            image,
            mask,
            height,
            width,
        });
    }

    Ok(pairs)
}

/// Decode a file to single-channel f32 intensities at the 0..255 scale.
fn decode_luma(path: &Path) -> UNetResult<(Vec<f32>, usize, usize)> {
    let img = image::open(path).map_err(|source| UNetError::ImageDecode {
        path: path.display().to_string(),
        source,
    })?;
    let img = img.to_luma8();
    let (width, height) = img.dimensions();
    let values = img.into_raw().into_iter().map(f32::from).collect();
    Ok((values, height as usize, width as usize))
}

/// Scale raw 0..255 intensities into [0, 1]. Masks are never normalized.
pub fn normalize<B: Backend>(image: Tensor<B, 3>) -> Tensor<B, 3> {
    image.div_scalar(255.0)
}

/// In-memory segmentation dataset applying the configured pipeline per item.
///
/// With `patches_per_image >= 2` each source pair is replayed that many
/// times per epoch, so several independent random crops are drawn from it.
/// Each item derives its own random generator from the pipeline seed and the
/// item index, which keeps every epoch layout reproducible under a fixed
/// seed while still giving every patch an independent draw.
pub struct SegmentationDataset<B: Backend> {
    pairs: Vec<RawPair>,
    config: PipelineConfig,
    transforms: Vec<Box<dyn Transform<B>>>,
    device: B::Device,
}

impl<B: Backend> SegmentationDataset<B> {
    /// Wrap already-loaded pairs with a pipeline configuration and an
    /// ordered list of augmentation transforms.
    pub fn new(
        pairs: Vec<RawPair>,
        config: PipelineConfig,
        transforms: Vec<Box<dyn Transform<B>>>,
        device: &B::Device,
    ) -> UNetResult<Self> {
        config.validate()?;
        if pairs.is_empty() {
            return Err(UNetError::Dataset {
                message: "Cannot build a dataset from zero pairs".to_string(),
            });
        }

        Ok(Self {
            pairs,
            config,
            transforms,
            device: device.clone(),
        })
    }

    /// Load pairs from `<root>/<raw_subdir>` and `<root>/<mask_subdir>` and
    /// wrap them in one step.
    pub fn from_directories(
        root: &Path,
        raw_subdir: &str,
        mask_subdir: &str,
        pattern: &str,
        config: PipelineConfig,
        transforms: Vec<Box<dyn Transform<B>>>,
        device: &B::Device,
    ) -> UNetResult<Self> {
        let pairs = load_image_mask_pairs(root, raw_subdir, mask_subdir, pattern)?;
        Self::new(pairs, config, transforms, device)
    }

    fn pair_to_tensors(&self, pair: &RawPair) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let shape = [1, pair.height, pair.width];
        let image = Tensor::from_data(
            TensorData::new(pair.image.clone(), shape).convert::<B::FloatElem>(),
            &self.device,
        );
        let mask = Tensor::from_data(
            TensorData::new(pair.mask.clone(), shape).convert::<B::FloatElem>(),
            &self.device,
        );
        (image, mask)
    }
}

impl<B: Backend> Dataset<SegmentationItem<B>> for SegmentationDataset<B> {
    fn get(&self, index: usize) -> Option<SegmentationItem<B>> {
        let pair = self.pairs.get(index / self.config.patches_per_image)?;
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ index as u64);

        let (image, mask) = self.pair_to_tensors(pair);
        let mut tensors = vec![normalize(image), mask];

        if let Some(size) = self.config.patch_size {
            tensors = RandomCrop::new(size).apply(tensors, &mut rng);
        }
        for transform in &self.transforms {
            tensors = transform.apply(tensors, &mut rng);
        }

        let mask = tensors.pop()?;
        let image = tensors.pop()?;
        Some(SegmentationItem { image, mask })
    }

    fn len(&self) -> usize {
        self.pairs.len() * self.config.patches_per_image
    }
}
