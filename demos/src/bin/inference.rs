//! UNet inference demo.
//!
//! Loads a trained model from a training artifact directory and predicts
//! per-pixel probability masks for one image or a directory of images. Any
//! input whose spatial size is divisible by the model's total pooling
//! factor is accepted, regardless of the patch size used in training.
//!
//! ## Usage
//!
//! ```bash
//! # Run inference on a single image
//! cargo run --bin inference -- artifacts/ image.png
//!
//! # Run inference on a directory of images
//! cargo run --bin inference -- artifacts/ input_dir/ --output output_dir/
//!
//! # Binarize at a custom threshold
//! cargo run --bin inference -- artifacts/ image.png --threshold 0.3
//! ```

use anyhow::{bail, ensure, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::TensorData,
};
use clap::Parser;
use image::GrayImage;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use unet_demos::{
    common::{create_device, get_backend_name, SelectedBackend},
    InferenceConfig, TrainingConfig,
};

use unet_burn::UNet;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Training artifact directory holding config.json and final_model.mpk
    artifacts: PathBuf,

    /// Path to the input image or directory
    input: PathBuf,

    /// Output directory for predicted masks
    #[arg(short, long, default_value = "outputs")]
    output: PathBuf,

    /// Threshold for a binary mask (0.0-1.0); omit for a soft mask
    #[arg(short, long)]
    threshold: Option<f32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = InferenceConfig::default();
    config.output_path = args.output;
    config.threshold = args.threshold;
    if let Some(threshold) = config.threshold {
        ensure!(
            (0.0..=1.0).contains(&threshold),
            "Threshold must be in [0, 1], got {threshold}"
        );
    }

    let training_config_path = args.artifacts.join("config.json");
    let training_config_str = fs::read_to_string(&training_config_path).with_context(|| {
        format!(
            "Failed to read training config: {}",
            training_config_path.display()
        )
    })?;
    let training_config: TrainingConfig = serde_json::from_str(&training_config_str)
        .with_context(|| {
            format!(
                "Failed to parse training config: {}",
                training_config_path.display()
            )
        })?;

    let device = create_device();
    println!("Using backend: {}", get_backend_name());

    let model_path = args.artifacts.join("final_model.mpk");
    let model = training_config
        .model
        .init::<SelectedBackend>(&device)
        .context("Failed to initialize UNet model")?
        .load_file(
            &model_path,
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
            &device,
        )
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

    // The skip-connection shapes only line up when both spatial dimensions
    // divide by the total pooling factor.
    let pooling_factor = training_config
        .model
        .pooling_size
        .pow(training_config.model.n_levels as u32 - 1);

    let inputs = collect_inputs(&args.input)?;
    fs::create_dir_all(&config.output_path).with_context(|| {
        format!(
            "Failed to create output directory at {}",
            config.output_path.display()
        )
    })?;

    for input in inputs {
        let start = Instant::now();
        let mask = predict(&model, &input, pooling_factor, config.threshold, &device)?;

        let stem = input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("prediction");
        let output_path = config.output_path.join(format!("{stem}_mask.png"));
        mask.save(&output_path)
            .with_context(|| format!("Failed to save mask to {}", output_path.display()))?;

        println!(
            "{} -> {} ({:.1} ms)",
            input.display(),
            output_path.display(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    Ok(())
}

/// Collect one image path or every image file in a directory.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("Input path does not exist: {}", input.display());
    }

    let extensions = ["png", "jpg", "jpeg", "tif", "tiff"];
    let mut inputs = Vec::new();
    for entry in fs::read_dir(input)
        .with_context(|| format!("Failed to read input directory: {}", input.display()))?
    {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && matches {
            inputs.push(path);
        }
    }
    inputs.sort();

    if inputs.is_empty() {
        bail!("No image files found in {}", input.display());
    }
    Ok(inputs)
}

/// Run the forward pass on one image and render the predicted mask.
fn predict(
    model: &UNet<SelectedBackend>,
    input: &Path,
    pooling_factor: usize,
    threshold: Option<f32>,
    device: &<SelectedBackend as Backend>::Device,
) -> Result<GrayImage> {
    let img = image::open(input)
        .with_context(|| format!("Failed to open image at {}", input.display()))?
        .to_luma8();
    let (width, height) = img.dimensions();

    ensure!(
        height as usize % pooling_factor == 0 && width as usize % pooling_factor == 0,
        "Input size {width}x{height} is not divisible by the pooling factor {pooling_factor}"
    );

    let values: Vec<f32> = img.into_raw().into_iter().map(f32::from).collect();
    let data = TensorData::new(values, [1, 1, height as usize, width as usize])
        .convert::<<SelectedBackend as Backend>::FloatElem>();
    let input_tensor = Tensor::<SelectedBackend, 4>::from_data(data, device).div_scalar(255.0);

    let probabilities = model.forward(input_tensor);
    let values = probabilities
        .slice([0..1, 0..1])
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Failed to read prediction data: {e:?}"))?;

    let mask = GrayImage::from_fn(width, height, |x, y| {
        let p = values[(y * width + x) as usize];
        let p = match threshold {
            Some(t) if p > t => 1.0,
            Some(_) => 0.0,
            None => p,
        };
        image::Luma([(p * 255.0).round() as u8])
    });

    Ok(mask)
}
