use log::{debug, info};

use crate::{
    Result, RfieldErr,
    chain::{Chain, Direction},
    rational::Rational,
};

/// The stride bookkeeping of one tensor of the chain, tensor 0 being the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorStride {
    /// Product of every upstream stride ratio, relative to the input's value spacing.
    pub cumulative_stride: Rational,
    /// Scaled physical distance between consecutive value elements.
    pub value_spacing: i64,
    /// Scaled physical distance between consecutive slots, value or padding.
    pub spacing: i64,
    /// How many slots one value element advances, `S` when consumed by an upsampling layer.
    pub slots_per_value: usize,
    /// Padding the consuming layer reads around this tensor, 0 for the final output.
    pub left_pad: usize,
    pub right_pad: usize,
}

/// The result of the downward pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulation {
    tensors: Vec<TensorStride>,
    global_scale: i64,
    low_water_mark: usize,
}

impl Accumulation {
    /// One record per tensor, `chain.len() + 1` in total.
    pub fn tensors(&self) -> &[TensorStride] {
        &self.tensors
    }

    /// The integer every unscaled cumulative stride is multiplied by.
    pub fn global_scale(&self) -> i64 {
        self.global_scale
    }

    /// Index of the densest tensor, the one scaled to unit stride.
    pub fn low_water_mark(&self) -> usize {
        self.low_water_mark
    }
}

/// Computes every tensor's cumulative stride and the global scale that turns them into
/// integers with the densest tensor at exactly 1.
///
/// # Arguments
/// * `chain` - The chain to walk.
///
/// The scale is the reciprocal of the smallest cumulative stride, so every stride must be a
/// whole multiple of the densest one. A chain whose strides only share a fractional common
/// measure, such as a single downsampling by 3/2, is rejected rather than rescaled.
///
/// # Returns
/// The per-tensor records, `NonIntegralChain` if some stride or spacing cannot be made an
/// integer while keeping the low-water-mark at 1, or `Overflow` naming the first layer
/// whose running stride product leaves the 64-bit range.
pub fn accumulate(chain: &Chain) -> Result<Accumulation> {
    let cumulative = cumulative_strides(chain)?;

    let (low_water_mark, min_stride) = cumulative
        .iter()
        .copied()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .ok_or_else(|| RfieldErr::MalformedChain("chain has no tensors".into()))?;

    let scale = min_stride.recip()?;
    let value_spacings = cumulative
        .iter()
        .enumerate()
        .map(|(t, &stride)| -> Result<i64> {
            let scaled = stride.checked_mul(scale)?;
            scaled.to_integer().map_err(|_| RfieldErr::NonIntegralChain {
                tensor: t,
                what: "cumulative stride",
                value: scaled,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // The input's stride is 1 before scaling, so its scaled stride is the scale itself.
    let global_scale = value_spacings[0];

    let layers = chain.layers();
    let tensors = cumulative
        .iter()
        .zip(&value_spacings)
        .enumerate()
        .map(|(t, (&cumulative_stride, &value_spacing))| -> Result<TensorStride> {
            let consumer = layers.get(t);
            let slots_per_value = match consumer {
                Some(layer) if layer.direction() == Direction::Upsampling => {
                    let stride = layer.stride();
                    stride
                        .to_integer()
                        .ok()
                        .and_then(|s| usize::try_from(s).ok())
                        .ok_or(RfieldErr::NonIntegralChain {
                            tensor: t,
                            what: "slots per value",
                            value: stride,
                        })?
                }
                _ => 1,
            };

            let spacing = Rational::new(value_spacing, slots_per_value as i64)?;
            let spacing = spacing.to_integer().map_err(|_| RfieldErr::NonIntegralChain {
                tensor: t,
                what: "spacing",
                value: spacing,
            })?;

            let record = TensorStride {
                cumulative_stride,
                value_spacing,
                spacing,
                slots_per_value,
                left_pad: consumer.map_or(0, |l| l.left_pad()),
                right_pad: consumer.map_or(0, |l| l.right_pad()),
            };
            debug!(
                tensor = t;
                "accumulated {}: stride={cumulative_stride} value_spacing={value_spacing} spacing={spacing}",
                chain.tensor_name(t)
            );
            Ok(record)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "global scale {global_scale}, low-water-mark at {} (stride {min_stride})",
        chain.tensor_name(low_water_mark)
    );

    Ok(Accumulation {
        tensors,
        global_scale,
        low_water_mark,
    })
}

/// Threads the running stride product through the chain without scaling anything.
fn cumulative_strides(chain: &Chain) -> Result<Vec<Rational>> {
    chain.layers().iter().enumerate().try_fold(
        vec![Rational::ONE],
        |mut strides, (k, layer)| -> Result<_> {
            let upstream = strides[strides.len() - 1];
            let stride = layer
                .stride_ratio()
                .and_then(|ratio| upstream.checked_mul(ratio))
                .map_err(|e| e.at_layer(k))?;
            strides.push(stride);
            Ok(strides)
        },
    )
}
