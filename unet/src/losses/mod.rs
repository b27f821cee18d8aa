//! Loss functions.

mod bce;

pub use bce::{BCELoss, BCELossConfig};
