use log::info;

use crate::{
    Result,
    accumulator::{Accumulation, accumulate},
    chain::{Chain, KnownSize, Side},
    geometry::Geometry,
    rational::Rational,
    solver::solve_sizes,
};

/// The full stride record of one tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatedLayer {
    pub name: String,
    /// Unscaled, relative to the input's value spacing.
    pub cumulative_stride: Rational,
    pub value_spacing: i64,
    pub spacing: i64,
    pub size: usize,
    /// Padding of the layer producing this tensor, 0 for the input.
    pub left_pad: usize,
    pub right_pad: usize,
}

/// Everything a chain resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    resolved: KnownSize,
    accumulation: Accumulation,
    table: Vec<AccumulatedLayer>,
    geometry: Geometry,
}

impl Solution {
    /// The size that was not given, tagged with its side of the chain.
    pub fn resolved(&self) -> KnownSize {
        self.resolved
    }

    pub fn global_scale(&self) -> i64 {
        self.accumulation.global_scale()
    }

    /// Index of the densest tensor.
    pub fn low_water_mark(&self) -> usize {
        self.accumulation.low_water_mark()
    }

    /// One record per tensor, index 0 being the input.
    pub fn table(&self) -> &[AccumulatedLayer] {
        &self.table
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

/// Solves a chain: strides on the way down, sizes from the known end, positions on the way
/// up. Either everything resolves or nothing is returned.
///
/// # Arguments
/// * `chain` - The chain to solve.
///
/// # Returns
/// The solution or the first error any pass produced.
pub fn solve(chain: &Chain) -> Result<Solution> {
    let accumulation = accumulate(chain)?;
    let sizes = solve_sizes(chain)?;
    let geometry = Geometry::build(chain, &accumulation, &sizes)?;

    let resolved = match chain.known().side() {
        Side::Input => KnownSize::Output(sizes[sizes.len() - 1]),
        Side::Output => KnownSize::Input(sizes[0]),
    };

    let table = accumulation
        .tensors()
        .iter()
        .zip(&sizes)
        .enumerate()
        .map(|(t, (stride, &size))| {
            let producer = t.checked_sub(1).map(|k| &chain.layers()[k]);
            AccumulatedLayer {
                name: chain.tensor_name(t),
                cumulative_stride: stride.cumulative_stride,
                value_spacing: stride.value_spacing,
                spacing: stride.spacing,
                size,
                left_pad: producer.map_or(0, |layer| layer.left_pad()),
                right_pad: producer.map_or(0, |layer| layer.right_pad()),
            }
        })
        .collect();

    info!(
        "solved {} layer(s): input size {}, output size {}",
        chain.len(),
        sizes[0],
        sizes[sizes.len() - 1]
    );

    Ok(Solution {
        resolved,
        accumulation,
        table,
        geometry,
    })
}
