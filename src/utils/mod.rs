pub mod amounts;
pub mod config_loader;

pub use amounts::{LiquidityThresholds, tokens_to_satoshis};
pub use config_loader::*;
