//! UNet demos
//!
//! This crate provides example applications for the UNet segmentation
//! model, including training, inference, and dataset inspection.
//!
//! ## Usage
//!
//! ```bash
//! # Train a model
//! cargo run --bin train -- --config config.json
//!
//! # Run inference
//! cargo run --bin inference -- artifacts/ image.png
//!
//! # Inspect dataset loading
//! cargo run --bin dataset_test -- --root datasets/nuclei
//! ```

pub mod common;
pub mod config;

pub use common::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
pub use config::{InferenceConfig, OptimizerKind, TrainingConfig};
