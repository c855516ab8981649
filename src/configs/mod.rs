mod adapter;
mod chain;

pub use adapter::Adapter;
pub use chain::{ChainConfig, DirectionConfig, LayerConfig, StrideConfig};
