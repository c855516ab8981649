use log::debug;

use crate::{
    Result, RfieldErr,
    chain::{Chain, Direction, KnownSize, LayerSpec, Side},
    rational::Rational,
};

/// The physical span covered by `n` elements placed `s` apart, `(n - 1) * s + 1`.
pub fn spaced(n: Rational, s: Rational) -> Result<Rational> {
    n.checked_sub(Rational::ONE)?
        .checked_mul(s)?
        .checked_add(Rational::ONE)
}

/// Computes the input size of `layer` that produces exactly `output` elements.
///
/// # Arguments
/// * `index` - The layer's position in its chain, used for error reporting.
/// * `layer` - The layer.
/// * `output` - The layer's output size.
///
/// # Returns
/// The input size, `IncompatibleGeometry` if it is fractional or smaller than 1, or
/// `Overflow` if an intermediate leaves the 64-bit range.
pub fn input_size(index: usize, layer: &LayerSpec, output: usize) -> Result<usize> {
    let s = layer.stride();
    let (wings, pads) = wings_and_pads(layer).map_err(|e| e.at_layer(index))?;
    let o = count(output)?;

    let value = match layer.direction() {
        Direction::Upsampling => s
            .checked_sub(Rational::ONE)
            .and_then(|v| v.checked_sub(pads))
            .and_then(|v| v.checked_add(o))
            .and_then(|v| v.checked_add(wings))
            .and_then(|v| v.checked_div(s)),
        Direction::Downsampling => spaced(o, s)
            .and_then(|v| v.checked_add(wings))
            .and_then(|v| v.checked_sub(pads)),
    }
    .map_err(|e| e.at_layer(index))?;

    whole_size(index, layer, Side::Input, value)
}

/// Computes the output size `layer` produces from exactly `input` elements.
///
/// # Arguments
/// * `index` - The layer's position in its chain, used for error reporting.
/// * `layer` - The layer.
/// * `input` - The layer's input size.
///
/// # Returns
/// The output size, `IncompatibleGeometry` if it is fractional or smaller than 1, or
/// `Overflow` if an intermediate leaves the 64-bit range.
pub fn output_size(index: usize, layer: &LayerSpec, input: usize) -> Result<usize> {
    let s = layer.stride();
    let (wings, pads) = wings_and_pads(layer).map_err(|e| e.at_layer(index))?;
    let i = count(input)?;

    let value = match layer.direction() {
        Direction::Upsampling => spaced(i, s)
            .and_then(|v| v.checked_add(pads))
            .and_then(|v| v.checked_sub(wings)),
        Direction::Downsampling => i
            .checked_add(pads)
            .and_then(|v| v.checked_sub(wings))
            .and_then(|v| v.checked_sub(Rational::ONE))
            .and_then(|v| v.checked_div(s))
            .and_then(|v| v.checked_add(Rational::ONE)),
    }
    .map_err(|e| e.at_layer(index))?;

    whole_size(index, layer, Side::Output, value)
}

/// Solves every tensor's size from the chain's known end towards the unknown one.
///
/// # Returns
/// `chain.len() + 1` sizes, index 0 being the input, or the error of the first incompatible
/// layer.
pub fn solve_sizes(chain: &Chain) -> Result<Vec<usize>> {
    let layers = chain.layers();
    let mut sizes = vec![0; layers.len() + 1];

    match chain.known() {
        KnownSize::Input(n) => {
            sizes[0] = n;
            for (k, layer) in layers.iter().enumerate() {
                sizes[k + 1] = output_size(k, layer, sizes[k])?;
                debug!(layer = k; "{} -> {}", sizes[k], sizes[k + 1]);
            }
        }
        KnownSize::Output(n) => {
            sizes[layers.len()] = n;
            for (k, layer) in layers.iter().enumerate().rev() {
                sizes[k] = input_size(k, layer, sizes[k + 1])?;
                debug!(layer = k; "{} <- {}", sizes[k], sizes[k + 1]);
            }
        }
    }

    Ok(sizes)
}

fn wings_and_pads(layer: &LayerSpec) -> Result<(Rational, Rational)> {
    let wings = count(layer.left_wing())?.checked_add(count(layer.right_wing())?)?;
    let pads = count(layer.left_pad())?.checked_add(count(layer.right_pad())?)?;
    Ok((wings, pads))
}

fn count(n: usize) -> Result<Rational> {
    i64::try_from(n)
        .map(Rational::from_integer)
        .map_err(|_| RfieldErr::MalformedChain(format!("{n} does not fit in a 64-bit count")))
}

fn whole_size(index: usize, layer: &LayerSpec, solving: Side, value: Rational) -> Result<usize> {
    value
        .to_integer()
        .ok()
        .filter(|&n| n >= 1)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(RfieldErr::IncompatibleGeometry {
            layer: index,
            direction: layer.direction(),
            solving,
            value,
        })
}
