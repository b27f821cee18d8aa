//! Dataset inspection demo.
//!
//! Loads a folder of paired raw/mask images through the full input pipeline
//! and prints per-item shapes and value ranges, which is the quickest way to
//! validate a new dataset layout before starting a training run.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin dataset_test -- --root datasets/nuclei --pattern '*.TIF'
//! ```

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use clap::Parser;
use std::path::PathBuf;
use unet_demos::common::{create_device, get_backend_name, SelectedBackend};

use unet_burn::{PipelineConfig, SegmentationDataset};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dataset root folder
    #[arg(long)]
    root: PathBuf,

    /// Subfolder holding the raw images
    #[arg(long, default_value = "raw")]
    raw_subdir: String,

    /// Subfolder holding the masks
    #[arg(long, default_value = "mask")]
    mask_subdir: String,

    /// Shell-style filename pattern
    #[arg(long, default_value = "*.png")]
    pattern: String,

    /// Patch size (height and width) for random cropping
    #[arg(long)]
    patch_size: Option<usize>,

    /// Number of samples to inspect
    #[arg(long, default_value = "10")]
    num_samples: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let device = create_device();
    println!("Using backend: {}", get_backend_name());

    let config = PipelineConfig::new().with_patch_size(args.patch_size.map(|size| [size, size]));
    let dataset = SegmentationDataset::<SelectedBackend>::from_directories(
        &args.root,
        &args.raw_subdir,
        &args.mask_subdir,
        &args.pattern,
        config,
        Vec::new(),
        &device,
    )
    .context("Failed to load dataset")?;

    println!("Dataset loaded with {} items", dataset.len());

    for index in 0..args.num_samples.min(dataset.len()) {
        let item = dataset
            .get(index)
            .with_context(|| format!("Missing dataset item {index}"))?;

        let image_range = (
            item.image.clone().min().into_scalar(),
            item.image.clone().max().into_scalar(),
        );
        let mask_sum = item.mask.clone().sum().into_scalar();

        println!(
            "item {index}: image {:?} in [{:.3}, {:.3}], mask {:?} with {} foreground pixels",
            item.image.dims(),
            image_range.0,
            image_range.1,
            item.mask.dims(),
            mask_sum,
        );
    }

    Ok(())
}
