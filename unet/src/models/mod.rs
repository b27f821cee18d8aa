//! Model definitions.

mod unet;

pub use unet::{ConvBlock, ConvBlockConfig, UNet, UNetConfig};
