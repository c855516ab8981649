use std::ops::RangeInclusive;

use log::debug;

use crate::{
    Result, RfieldErr,
    accumulator::Accumulation,
    chain::{Chain, Wings},
    rational::Rational,
};

/// Whether an element slot carries real data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Value,
    Padding,
}

/// One element slot of a tensor at its physical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub position: i64,
    pub kind: SlotKind,
}

/// The placed slots of one tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorGeometry {
    name: String,
    size: usize,
    spacing: i64,
    value_spacing: i64,
    first_value: i64,
    // Wings of the layer producing this tensor, `None` for the input.
    producer_wings: Option<Wings>,
    slots: Vec<Slot>,
}

impl TensorGeometry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of value elements.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn spacing(&self) -> i64 {
        self.spacing
    }

    pub fn value_spacing(&self) -> i64 {
        self.value_spacing
    }

    /// Every slot, padding included, in increasing position order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Physical position of value element `index`, if it exists.
    pub fn value_position(&self, index: usize) -> Option<i64> {
        if index >= self.size {
            return None;
        }

        i64::try_from(index)
            .ok()?
            .checked_mul(self.value_spacing)?
            .checked_add(self.first_value)
    }

    /// Positions of the value elements only.
    pub fn value_positions(&self) -> impl Iterator<Item = i64> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.kind == SlotKind::Value)
            .map(|slot| slot.position)
    }

    fn first_slot(&self) -> i64 {
        self.slots.first().map_or(self.first_value, |slot| slot.position)
    }

    /// Index range of the value elements lying within `[lo, hi]`.
    fn values_within(&self, lo: i64, hi: i64) -> Option<RangeInclusive<usize>> {
        let vs = self.value_spacing;
        let last_index = i64::try_from(self.size).ok()? - 1;
        let first = Rational::new(lo.checked_sub(self.first_value)?, vs)
            .ok()?
            .ceil()
            .max(0);
        let last = Rational::new(hi.checked_sub(self.first_value)?, vs)
            .ok()?
            .floor()
            .min(last_index);

        (first <= last).then(|| first as usize..=last as usize)
    }
}

/// Every tensor of a chain placed in one shared integer coordinate system whose origin is
/// the input's first slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    tensors: Vec<TensorGeometry>,
}

impl Geometry {
    /// Places every slot of every tensor, walking from the input towards the output.
    ///
    /// # Arguments
    /// * `chain` - The chain being placed.
    /// * `acc` - The scaled strides of the chain.
    /// * `sizes` - The value count of every tensor.
    ///
    /// # Returns
    /// The geometry or `MalformedChain` if the records do not describe the same chain.
    pub fn build(chain: &Chain, acc: &Accumulation, sizes: &[usize]) -> Result<Self> {
        let strides = acc.tensors();
        let ntensors = chain.len() + 1;
        if strides.len() != ntensors || sizes.len() != ntensors {
            return Err(RfieldErr::MalformedChain(format!(
                "expected {ntensors} tensor records, got {} strides and {} sizes",
                strides.len(),
                sizes.len()
            )));
        }

        if let Some(t) = sizes.iter().position(|&size| size == 0) {
            return Err(RfieldErr::MalformedChain(format!("tensor {t} has no elements")));
        }

        let mut tensors: Vec<TensorGeometry> = Vec::with_capacity(ntensors);

        for (t, (stride, &size)) in strides.iter().zip(sizes).enumerate() {
            let producer = t.checked_sub(1).map(|k| &chain.layers()[k]);
            let overflow = || RfieldErr::Overflow { layer: t.checked_sub(1) };
            let offset = |slots: usize, spacing: i64| {
                i64::try_from(slots)
                    .ok()
                    .and_then(|n| n.checked_mul(spacing))
                    .ok_or_else(overflow)
            };

            // The first value sits `left_wing` slots into the producer's padded input.
            let first_value = match (producer, tensors.last()) {
                (Some(layer), Some(below)) => below
                    .first_slot()
                    .checked_add(offset(layer.left_wing(), below.spacing)?)
                    .ok_or_else(overflow)?,
                _ => offset(stride.left_pad, stride.spacing)?,
            };

            let first_slot = first_value
                .checked_sub(offset(stride.left_pad, stride.spacing)?)
                .ok_or_else(overflow)?;
            let spv = stride.slots_per_value;
            let values_end = (size - 1)
                .checked_mul(spv)
                .and_then(|n| n.checked_add(stride.left_pad + 1))
                .ok_or_else(overflow)?;
            let nslots = values_end
                .checked_add(stride.right_pad)
                .ok_or_else(overflow)?;

            // The last slot bounds every other position of this tensor.
            first_slot
                .checked_add(offset(nslots - 1, stride.spacing)?)
                .ok_or_else(overflow)?;

            let slots = (0..nslots)
                .map(|i| {
                    let is_value =
                        i >= stride.left_pad && i < values_end && (i - stride.left_pad) % spv == 0;

                    Slot {
                        position: first_slot + i as i64 * stride.spacing,
                        kind: if is_value {
                            SlotKind::Value
                        } else {
                            SlotKind::Padding
                        },
                    }
                })
                .collect();

            debug!(
                tensor = t;
                "placed {} slots, first value at {first_value}",
                nslots
            );

            tensors.push(TensorGeometry {
                name: chain.tensor_name(t),
                size,
                spacing: stride.spacing,
                value_spacing: stride.value_spacing,
                first_value,
                producer_wings: producer.map(|layer| layer.wings()),
                slots,
            });
        }

        Ok(Self { tensors })
    }

    /// One entry per tensor, index 0 being the input.
    pub fn tensors(&self) -> &[TensorGeometry] {
        &self.tensors
    }

    pub fn tensor(&self, t: usize) -> Option<&TensorGeometry> {
        self.tensors.get(t)
    }

    /// Smallest and largest slot positions over the whole chain.
    pub fn bounds(&self) -> (i64, i64) {
        let positions = self
            .tensors
            .iter()
            .flat_map(|t| t.slots.iter().map(|slot| slot.position));

        positions.fold((i64::MAX, i64::MIN), |(lo, hi), p| (lo.min(p), hi.max(p)))
    }

    /// How far tensor `b`'s values reach inside tensor `a`'s values, counted in `a`'s value
    /// elements.
    ///
    /// # Returns
    /// `(left, right)`: the number of `a` values before `b`'s first value and after `b`'s
    /// last value. Negative counts mean `b` extends past `a` on that side. Fails with
    /// `NonIntegral` if a distance is not a whole number of `a`'s value spacings.
    pub fn offsets(&self, a: usize, b: usize) -> Result<(i64, i64)> {
        let (Some(ta), Some(tb)) = (self.tensor(a), self.tensor(b)) else {
            return Err(RfieldErr::MalformedChain(format!(
                "offsets between tensors {a} and {b} of a {}-tensor chain",
                self.tensors.len()
            )));
        };

        let overflow = || RfieldErr::Overflow { layer: None };
        let (Some(a_last), Some(b_last)) = (
            ta.value_position(ta.size - 1),
            tb.value_position(tb.size - 1),
        ) else {
            return Err(overflow());
        };

        let left = tb.first_value.checked_sub(ta.first_value).ok_or_else(overflow)?;
        let right = a_last.checked_sub(b_last).ok_or_else(overflow)?;
        let spacing = ta.value_spacing;
        Ok((
            Rational::new(left, spacing)?.to_integer()?,
            Rational::new(right, spacing)?.to_integer()?,
        ))
    }

    /// The input values that influence value `index` of `tensor`.
    ///
    /// # Returns
    /// The inclusive range of input value indices, or `None` if the element does not exist or
    /// only ever reads padding.
    pub fn receptive_field(&self, tensor: usize, index: usize) -> Option<RangeInclusive<usize>> {
        let position = self.tensor(tensor)?.value_position(index)?;
        let (mut lo, mut hi) = (position, position);
        let mut field = index..=index;

        for t in (1..=tensor).rev() {
            let wings = self.tensors[t].producer_wings?;
            let below = &self.tensors[t - 1];

            lo = lo.checked_sub(i64::try_from(wings.left).ok()?.checked_mul(below.spacing)?)?;
            hi = hi.checked_add(i64::try_from(wings.right).ok()?.checked_mul(below.spacing)?)?;

            field = below.values_within(lo, hi)?;
            lo = below.value_position(*field.start())?;
            hi = below.value_position(*field.end())?;
        }

        Some(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accumulator::accumulate,
        chain::{Direction, KnownSize, LayerSpec},
        solver::solve_sizes,
    };

    fn layer(direction: Direction, s: i64, wings: (usize, usize), pads: (usize, usize)) -> LayerSpec {
        LayerSpec::new(
            direction,
            Rational::from_integer(s),
            Wings::new(wings.0, wings.1),
            pads,
        )
        .unwrap()
    }

    fn place(layers: Vec<LayerSpec>, known: KnownSize) -> Geometry {
        let chain = Chain::new(layers, known).unwrap();
        let acc = accumulate(&chain).unwrap();
        let sizes = solve_sizes(&chain).unwrap();
        Geometry::build(&chain, &acc, &sizes).unwrap()
    }

    fn positions(t: &TensorGeometry) -> Vec<i64> {
        t.slots().iter().map(|s| s.position).collect()
    }

    fn kinds(t: &TensorGeometry) -> String {
        t.slots()
            .iter()
            .map(|s| match s.kind {
                SlotKind::Value => '*',
                SlotKind::Padding => 'o',
            })
            .collect()
    }

    #[test]
    fn unpadded_convolution_is_centered() {
        let geom = place(
            vec![layer(Direction::Downsampling, 1, (1, 1), (0, 0))],
            KnownSize::Input(5),
        );

        assert_eq!(positions(&geom.tensors()[0]), [0, 1, 2, 3, 4]);
        assert_eq!(positions(&geom.tensors()[1]), [1, 2, 3]);
    }

    #[test]
    fn padding_slots_shift_the_origin() {
        let geom = place(
            vec![layer(Direction::Downsampling, 2, (1, 1), (1, 1))],
            KnownSize::Input(5),
        );

        let input = &geom.tensors()[0];
        assert_eq!(kinds(input), "o*****o");
        assert_eq!(positions(input), [0, 1, 2, 3, 4, 5, 6]);

        // Output 3 values, centered on padded slots 1, 3, 5.
        let output = &geom.tensors()[1];
        assert_eq!(output.size(), 3);
        assert_eq!(positions(output), [1, 3, 5]);
    }

    #[test]
    fn upsampling_interleaves_padding() {
        let geom = place(
            vec![layer(Direction::Upsampling, 2, (0, 0), (0, 0))],
            KnownSize::Output(5),
        );

        let input = &geom.tensors()[0];
        assert_eq!(input.size(), 3);
        assert_eq!(kinds(input), "*o*o*");
        assert_eq!(input.value_positions().collect::<Vec<_>>(), [0, 2, 4]);
        assert_eq!(positions(&geom.tensors()[1]), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn slot_positions_increase_by_spacing() {
        let geom = place(
            vec![
                layer(Direction::Downsampling, 1, (1, 1), (0, 0)),
                layer(Direction::Upsampling, 3, (1, 1), (2, 2)),
                layer(Direction::Downsampling, 2, (0, 1), (1, 1)),
            ],
            KnownSize::Input(6),
        );

        for t in geom.tensors() {
            for pair in t.slots().windows(2) {
                assert_eq!(pair[1].position - pair[0].position, t.spacing());
            }
        }
    }

    #[test]
    fn positions_out_of_range_are_an_error() {
        let chain = Chain::new(
            [layer(Direction::Downsampling, 1, (0, 0), (0, 0))],
            KnownSize::Input(1),
        )
        .unwrap();
        let acc = accumulate(&chain).unwrap();

        assert_eq!(
            Geometry::build(&chain, &acc, &[usize::MAX, usize::MAX]),
            Err(RfieldErr::Overflow { layer: None })
        );
    }

    #[test]
    fn offsets_between_tensors() {
        let geom = place(
            vec![
                layer(Direction::Downsampling, 1, (1, 0), (0, 0)),
                layer(Direction::Downsampling, 1, (2, 0), (0, 0)),
            ],
            KnownSize::Output(4),
        );

        // 7 input values at 0..=6, then 6 values at 1..=6, then 4 values at 3..=6.
        assert_eq!(geom.offsets(0, 2).unwrap(), (3, 0));
        assert_eq!(geom.offsets(1, 2).unwrap(), (2, 0));
        assert_eq!(geom.offsets(2, 0).unwrap(), (-3, 0));
    }

    #[test]
    fn offsets_must_be_whole_values() {
        let geom = place(
            vec![layer(Direction::Upsampling, 2, (1, 0), (0, 0))],
            KnownSize::Input(3),
        );

        // Input values at 0, 2, 4, output starts at 1.
        assert!(matches!(geom.offsets(0, 1), Err(RfieldErr::NonIntegral { .. })));
        assert_eq!(geom.offsets(1, 0).unwrap(), (-1, 0));
    }

    #[test]
    fn receptive_field_grows_through_the_chain() {
        let geom = place(
            vec![
                layer(Direction::Downsampling, 1, (1, 1), (0, 0)),
                layer(Direction::Downsampling, 2, (1, 1), (0, 0)),
            ],
            KnownSize::Output(2),
        );

        assert_eq!(geom.tensors()[0].size(), 7);
        assert_eq!(geom.receptive_field(2, 0), Some(0..=4));
        assert_eq!(geom.receptive_field(2, 1), Some(2..=6));
        assert_eq!(geom.receptive_field(1, 3), Some(3..=5));
        assert_eq!(geom.receptive_field(0, 6), Some(6..=6));
        assert_eq!(geom.receptive_field(2, 2), None);
    }

    #[test]
    fn receptive_field_of_dilation_zero_is_empty() {
        let geom = place(
            vec![layer(Direction::Upsampling, 2, (0, 0), (0, 0))],
            KnownSize::Input(3),
        );

        assert_eq!(geom.receptive_field(1, 0), Some(0..=0));
        assert_eq!(geom.receptive_field(1, 1), None);
        assert_eq!(geom.receptive_field(1, 2), Some(1..=1));
    }
}
