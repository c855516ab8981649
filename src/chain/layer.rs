use std::fmt::{self, Display};

use crate::{Result, RfieldErr, rational::Rational};

/// Whether a layer makes its output denser or sparser than its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Transposed convolution: the input is dilated by the stride before filtering.
    Upsampling,
    /// Strided convolution or pooling.
    Downsampling,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upsampling => f.write_str("upsampling"),
            Direction::Downsampling => f.write_str("downsampling"),
        }
    }
}

/// The footprint of a filter around its central element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wings {
    pub left: usize,
    pub right: usize,
}

impl Wings {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    /// Splits a filter of `size` elements around its central element, giving the extra
    /// element to the right wing when `size` is even.
    ///
    /// # Returns
    /// The wings or `MalformedChain` if `size` is zero.
    pub fn from_filter_size(size: usize) -> Result<Self> {
        let Some(total) = size.checked_sub(1) else {
            return Err(RfieldErr::MalformedChain(
                "filter size must be at least 1".into(),
            ));
        };

        let left = total / 2;
        Ok(Self::new(left, total - left))
    }

    /// Number of elements the filter covers.
    pub fn filter_size(&self) -> usize {
        self.left + self.right + 1
    }
}

/// Immutable description of one resampling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    name: Option<String>,
    direction: Direction,
    stride: Rational,
    wings: Wings,
    left_pad: usize,
    right_pad: usize,
}

impl LayerSpec {
    /// Creates a new `LayerSpec`.
    ///
    /// # Arguments
    /// * `direction` - Whether the layer up or downsamples.
    /// * `stride` - The stride for downsampling layers or the inverse stride for upsampling ones.
    /// * `wings` - The filter footprint.
    /// * `padding` - Left and right padding applied to the layer's input.
    ///
    /// # Returns
    /// The layer or `MalformedChain` if the stride is not strictly positive.
    pub fn new(
        direction: Direction,
        stride: Rational,
        wings: Wings,
        (left_pad, right_pad): (usize, usize),
    ) -> Result<Self> {
        if !stride.is_positive() {
            return Err(RfieldErr::MalformedChain(format!(
                "stride must be positive, got {stride}"
            )));
        }

        Ok(Self {
            name: None,
            direction,
            stride,
            wings,
            left_pad,
            right_pad,
        })
    }

    pub fn downsampling(stride: Rational, wings: Wings, padding: (usize, usize)) -> Result<Self> {
        Self::new(Direction::Downsampling, stride, wings, padding)
    }

    pub fn upsampling(stride: Rational, wings: Wings, padding: (usize, usize)) -> Result<Self> {
        Self::new(Direction::Upsampling, stride, wings, padding)
    }

    /// The transposed convolution used to upsample local conditioning vectors: a filter of
    /// `filter_size` elements and `stride - 1` end padding on each side.
    pub fn transposed_conv(stride: usize, filter_size: usize) -> Result<Self> {
        let Some(end_padding) = stride.checked_sub(1) else {
            return Err(RfieldErr::MalformedChain(
                "transposed convolution stride must be at least 1".into(),
            ));
        };
        let stride = i64::try_from(stride)
            .map_err(|_| RfieldErr::MalformedChain(format!("stride {stride} is too large")))?;

        Self::upsampling(
            Rational::new(stride, 1)?,
            Wings::from_filter_size(filter_size)?,
            (end_padding, end_padding),
        )
    }

    /// Attaches a display name to the layer.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The configured stride `S`, an inverse stride for upsampling layers.
    pub fn stride(&self) -> Rational {
        self.stride
    }

    pub fn wings(&self) -> Wings {
        self.wings
    }

    pub fn left_wing(&self) -> usize {
        self.wings.left
    }

    pub fn right_wing(&self) -> usize {
        self.wings.right
    }

    pub fn left_pad(&self) -> usize {
        self.left_pad
    }

    pub fn right_pad(&self) -> usize {
        self.right_pad
    }

    /// Returns `output.value_spacing / input.value_spacing` for this layer.
    pub fn stride_ratio(&self) -> Result<Rational> {
        match self.direction {
            Direction::Downsampling => Ok(self.stride),
            Direction::Upsampling => self.stride.recip(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wings_from_filter_size() {
        assert_eq!(Wings::from_filter_size(1).unwrap(), Wings::new(0, 0));
        assert_eq!(Wings::from_filter_size(2).unwrap(), Wings::new(0, 1));
        assert_eq!(Wings::from_filter_size(3).unwrap(), Wings::new(1, 1));
        assert_eq!(Wings::from_filter_size(4).unwrap(), Wings::new(1, 2));
        assert_eq!(Wings::new(4, 0).filter_size(), 5);
        assert!(Wings::from_filter_size(0).is_err());
    }

    #[test]
    fn stride_ratio_follows_direction() {
        let three = Rational::from_integer(3);
        let down = LayerSpec::downsampling(three, Wings::new(1, 1), (0, 0)).unwrap();
        let up = LayerSpec::upsampling(three, Wings::new(1, 1), (0, 0)).unwrap();

        assert_eq!(down.stride_ratio().unwrap(), three);
        assert_eq!(up.stride_ratio().unwrap(), Rational::new(1, 3).unwrap());
    }

    #[test]
    fn rejects_non_positive_stride() {
        let res = LayerSpec::downsampling(Rational::ZERO, Wings::new(0, 0), (0, 0));
        assert!(matches!(res, Err(RfieldErr::MalformedChain(_))));

        let res = LayerSpec::upsampling(Rational::from_integer(-2), Wings::new(0, 0), (0, 0));
        assert!(matches!(res, Err(RfieldErr::MalformedChain(_))));
    }

    #[test]
    fn transposed_conv_pads_by_stride_minus_one() {
        let layer = LayerSpec::transposed_conv(4, 4).unwrap().with_name("up");

        assert_eq!(layer.name(), Some("up"));
        assert_eq!(layer.direction(), Direction::Upsampling);
        assert_eq!(layer.stride(), Rational::from_integer(4));
        assert_eq!(layer.wings(), Wings::new(1, 2));
        assert_eq!((layer.left_pad(), layer.right_pad()), (3, 3));
    }
}
