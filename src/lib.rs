//! Exact spatial correspondence between the elements of tensors produced by a chain of
//! resampling layers (convolutions, pooling, transposed convolutions).
//!
//! A [`Chain`] is solved in three passes: the [`accumulator`] walks the strides and finds
//! the integer scale that puts the densest tensor at unit stride, the [`solver`] inverts
//! each layer's size equation from the known end, and the [`geometry`] pass places every
//! slot of every tensor in one shared integer coordinate system.

pub mod accumulator;
pub mod chain;
pub mod configs;
pub mod error;
pub mod geometry;
pub mod rational;
pub mod render;
pub mod solver;
mod solution;

pub use chain::{Chain, Direction, KnownSize, LayerSpec, Side, Wings};
pub use error::{Result, RfieldErr};
pub use geometry::{Geometry, Slot, SlotKind};
pub use rational::Rational;
pub use render::{Renderer, TextRenderer};
pub use solution::{AccumulatedLayer, Solution, solve};

use configs::{Adapter, ChainConfig};

/// Parses, adapts and solves a JSON chain description.
///
/// # Errors
/// Returns `MalformedChain` for invalid descriptions, otherwise whatever the solve produced.
pub fn solve_json(json: &str) -> Result<Solution> {
    let config = ChainConfig::from_json(json)?;
    let chain = Adapter::new().adapt(&config)?;
    solve(&chain)
}
