//! UNet training demo.
//!
//! Trains the encoder-decoder on a folder of paired raw/mask images using
//! the Burn Learner, with loss and pixel-accuracy metrics and an artifact
//! directory for checkpoints and scalar summaries.
//!
//! ## Usage
//!
//! ```bash
//! # Train with default configuration
//! cargo run --bin train
//!
//! # Train with a configuration file and overrides
//! cargo run --bin train -- --config train_config.json --num-epochs 50
//!
//! # Train on GPU
//! cargo run --bin train --features wgpu --no-default-features
//! ```

use anyhow::{bail, ensure, Context, Result};
use burn::{
    backend::Autodiff,
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::Module,
    optim::{AdamConfig, AdamWConfig, Optimizer},
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::Backend,
    train::{metric::LossMetric, LearnerBuilder},
};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use unet_demos::{
    common::{create_device, get_backend_name, SelectedBackend, SelectedDevice},
    OptimizerKind, TrainingConfig,
};

use unet_burn::{
    GaussianNoise, PixelAccuracyMetric, RandomAxisFlip, SegmentationBatch, SegmentationBatcher,
    SegmentationDataset, Transform, UNet,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override batch size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Override number of epochs
    #[arg(long)]
    num_epochs: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Override optimizer
    #[arg(long, value_enum)]
    optimizer: Option<OptimizerKind>,

    /// Override training dataset root
    #[arg(long)]
    train_root: Option<PathBuf>,

    /// Override validation dataset root
    #[arg(long)]
    val_root: Option<PathBuf>,

    /// Override artifact directory
    #[arg(long)]
    artifact_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        serde_json::from_str::<TrainingConfig>(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
    } else {
        TrainingConfig::default()
    };

    // Apply command line overrides
    if let Some(batch_size) = args.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    if let Some(num_epochs) = args.num_epochs {
        config.num_epochs = num_epochs;
    }
    if let Some(learning_rate) = args.learning_rate {
        config.learning_rate = learning_rate;
    }
    if let Some(optimizer) = args.optimizer {
        config.optimizer = optimizer;
    }
    if let Some(train_root) = args.train_root {
        config.train_root = train_root;
    }
    if let Some(val_root) = args.val_root {
        config.val_root = val_root;
    }
    if let Some(artifact_dir) = args.artifact_dir {
        config.artifact_dir = artifact_dir;
    }

    ensure!(
        config.num_epochs > 0,
        "Number of epochs must be greater than 0"
    );
    ensure!(config.learning_rate > 0.0, "Learning rate must be positive");
    if !config.train_root.exists() {
        bail!(
            "Training dataset root does not exist: {}",
            config.train_root.display()
        );
    }
    if !config.val_root.exists() {
        bail!(
            "Validation dataset root does not exist: {}",
            config.val_root.display()
        );
    }

    println!("Starting UNet training with configuration:");
    println!("  Batch size: {}", config.pipeline.batch_size);
    println!("  Number of epochs: {}", config.num_epochs);
    println!("  Learning rate: {}", config.learning_rate);
    println!("  Optimizer: {:?}", config.optimizer);
    println!("  Training dataset: {}", config.train_root.display());
    println!("  Validation dataset: {}", config.val_root.display());
    println!("  Artifact directory: {}", config.artifact_dir.display());

    std::fs::create_dir_all(&config.artifact_dir).with_context(|| {
        format!(
            "Failed to create artifact directory at {}",
            config.artifact_dir.display()
        )
    })?;

    let device = create_device();
    println!("Using backend: {}", get_backend_name());

    let model = config
        .model
        .init::<Autodiff<SelectedBackend>>(&device)
        .context("Failed to initialize UNet model")?;

    let (train_dataset, valid_dataset) = create_datasets(&config, &device)?;
    let (train_dataloader, valid_dataloader) =
        create_dataloaders(&config, train_dataset, valid_dataset);

    // Persist the effective configuration next to the artifacts so the
    // inference demo can rebuild the same model.
    let config_json = serde_json::to_string_pretty(&config)?;
    std::fs::write(config.artifact_dir.join("config.json"), config_json)?;

    println!("Starting training...");
    let model_trained = match config.optimizer {
        OptimizerKind::Adam => fit(
            model,
            AdamConfig::new().init(),
            &config,
            device,
            train_dataloader,
            valid_dataloader,
        ),
        OptimizerKind::AdamW => fit(
            model,
            AdamWConfig::new().init(),
            &config,
            device,
            train_dataloader,
            valid_dataloader,
        ),
    };

    save_final_model(&config, model_trained)?;

    println!("Training completed successfully!");

    Ok(())
}

/// Builds the transform list shared by training pipelines.
fn create_transforms<B: Backend>(config: &TrainingConfig) -> Vec<Box<dyn Transform<B>>> {
    let mut transforms: Vec<Box<dyn Transform<B>>> = Vec::new();
    if config.flip_prob > 0.0 {
        transforms.push(Box::new(RandomAxisFlip::new(2, config.flip_prob)));
    }
    if config.noise_mu > 0.0 {
        transforms.push(Box::new(GaussianNoise::new(
            config.noise_mu,
            config.noise_sigma,
            0,
        )));
    }
    transforms
}

/// Creates training and validation datasets.
///
/// Validation keeps the crop (the model accepts any pooling-compatible
/// size, but fixed patches keep batches stackable) and drops the random
/// augmentations.
fn create_datasets(
    config: &TrainingConfig,
    device: &SelectedDevice,
) -> Result<(
    SegmentationDataset<Autodiff<SelectedBackend>>,
    SegmentationDataset<SelectedBackend>,
)> {
    println!("Loading training dataset...");
    let train_dataset = SegmentationDataset::from_directories(
        &config.train_root,
        &config.raw_subdir,
        &config.mask_subdir,
        &config.pattern,
        config.pipeline.clone(),
        create_transforms(config),
        device,
    )
    .context("Failed to create training dataset")?;

    println!("Loading validation dataset...");
    let valid_pipeline = config.pipeline.clone().with_patches_per_image(1);
    let valid_dataset = SegmentationDataset::from_directories(
        &config.val_root,
        &config.raw_subdir,
        &config.mask_subdir,
        &config.pattern,
        valid_pipeline,
        Vec::new(),
        device,
    )
    .context("Failed to create validation dataset")?;

    Ok((train_dataset, valid_dataset))
}

/// Creates training and validation data loaders with shuffling, batching,
/// and worker-based prefetching.
fn create_dataloaders(
    config: &TrainingConfig,
    train_dataset: SegmentationDataset<Autodiff<SelectedBackend>>,
    valid_dataset: SegmentationDataset<SelectedBackend>,
) -> (
    Arc<dyn DataLoader<Autodiff<SelectedBackend>, SegmentationBatch<Autodiff<SelectedBackend>>>>,
    Arc<dyn DataLoader<SelectedBackend, SegmentationBatch<SelectedBackend>>>,
) {
    let train_dataloader = DataLoaderBuilder::new(SegmentationBatcher::new())
        .batch_size(config.pipeline.batch_size)
        .shuffle(config.pipeline.seed)
        .num_workers(config.num_workers)
        .build(train_dataset);

    let valid_dataloader = DataLoaderBuilder::new(SegmentationBatcher::<SelectedBackend>::new())
        .batch_size(config.pipeline.batch_size)
        .shuffle(config.pipeline.seed)
        .num_workers(config.num_workers)
        .build(valid_dataset);

    (train_dataloader, valid_dataloader)
}

/// Runs the Learner with the chosen optimizer.
fn fit<O>(
    model: UNet<Autodiff<SelectedBackend>>,
    optimizer: O,
    config: &TrainingConfig,
    device: SelectedDevice,
    train_dataloader: Arc<
        dyn DataLoader<Autodiff<SelectedBackend>, SegmentationBatch<Autodiff<SelectedBackend>>>,
    >,
    valid_dataloader: Arc<dyn DataLoader<SelectedBackend, SegmentationBatch<SelectedBackend>>>,
) -> UNet<Autodiff<SelectedBackend>>
where
    O: Optimizer<UNet<Autodiff<SelectedBackend>>, Autodiff<SelectedBackend>> + 'static,
{
    let learner = LearnerBuilder::new(&config.artifact_dir)
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .metric_valid_numeric(PixelAccuracyMetric::new())
        .devices(vec![device])
        .num_epochs(config.num_epochs)
        .build(model, optimizer, config.learning_rate);

    learner.fit(train_dataloader, valid_dataloader)
}

/// Saves the final trained model.
fn save_final_model(
    config: &TrainingConfig,
    model: UNet<Autodiff<SelectedBackend>>,
) -> Result<()> {
    let final_model_path = config.artifact_dir.join("final_model.mpk");
    println!("Saving final model to: {}", final_model_path.display());

    model
        .save_file(
            &final_model_path,
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
        )
        .with_context(|| {
            format!(
                "Failed to save final model to {}",
                final_model_path.display()
            )
        })?;

    Ok(())
}
