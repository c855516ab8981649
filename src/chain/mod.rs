mod layer;

use std::fmt::{self, Display};

pub use layer::{Direction, LayerSpec, Wings};

use crate::{Result, RfieldErr};

/// One end of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Input,
    Output,
}

impl Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Input => f.write_str("input"),
            Side::Output => f.write_str("output"),
        }
    }
}

/// The single size a chain is solved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownSize {
    Input(usize),
    Output(usize),
}

impl KnownSize {
    pub fn side(&self) -> Side {
        match self {
            KnownSize::Input(_) => Side::Input,
            KnownSize::Output(_) => Side::Output,
        }
    }

    pub fn size(&self) -> usize {
        match *self {
            KnownSize::Input(n) | KnownSize::Output(n) => n,
        }
    }
}

/// An ordered sequence of layers, index 0 closest to the input, plus the one known size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    layers: Vec<LayerSpec>,
    known: KnownSize,
}

impl Chain {
    /// Creates a new `Chain`.
    ///
    /// # Arguments
    /// * `layers` - The layers from input to output.
    /// * `known` - The size the chain is solved from.
    ///
    /// # Returns
    /// The chain or `MalformedChain` if there are no layers or the known size is zero.
    pub fn new<I>(layers: I, known: KnownSize) -> Result<Self>
    where
        I: IntoIterator<Item = LayerSpec>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        if layers.is_empty() {
            return Err(RfieldErr::MalformedChain(
                "chain must have at least one layer".into(),
            ));
        }

        if known.size() == 0 {
            return Err(RfieldErr::MalformedChain(format!(
                "{} size must be at least 1",
                known.side()
            )));
        }

        Ok(Self { layers, known })
    }

    /// Creates a `Chain` from optional input and output sizes, exactly one of which must be
    /// given.
    pub fn from_sizes<I>(layers: I, input: Option<usize>, output: Option<usize>) -> Result<Self>
    where
        I: IntoIterator<Item = LayerSpec>,
    {
        let known = match (input, output) {
            (Some(n), None) => KnownSize::Input(n),
            (None, Some(n)) => KnownSize::Output(n),
            (Some(_), Some(_)) => {
                return Err(RfieldErr::MalformedChain(
                    "both input and output sizes were given, expected exactly one".into(),
                ));
            }
            (None, None) => {
                return Err(RfieldErr::MalformedChain(
                    "neither input nor output size was given, expected exactly one".into(),
                ));
            }
        };

        Self::new(layers, known)
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn known(&self) -> KnownSize {
        self.known
    }

    /// Number of layers; the chain has one more tensor than this.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Display name of tensor `t`: `input` for the raw input, otherwise the name of the
    /// layer producing it.
    pub fn tensor_name(&self, t: usize) -> String {
        match t.checked_sub(1) {
            None => "input".into(),
            Some(k) => self
                .layers
                .get(k)
                .and_then(LayerSpec::name)
                .map_or_else(|| format!("layer_{k}"), str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::Rational;

    fn identity() -> LayerSpec {
        LayerSpec::downsampling(Rational::ONE, Wings::new(0, 0), (0, 0)).unwrap()
    }

    #[test]
    fn exactly_one_size() {
        assert!(Chain::from_sizes([identity()], Some(3), None).is_ok());
        assert!(Chain::from_sizes([identity()], None, Some(3)).is_ok());
        assert!(matches!(
            Chain::from_sizes([identity()], Some(3), Some(3)),
            Err(RfieldErr::MalformedChain(_))
        ));
        assert!(matches!(
            Chain::from_sizes([identity()], None, None),
            Err(RfieldErr::MalformedChain(_))
        ));
    }

    #[test]
    fn rejects_empty_chain_and_zero_size() {
        assert!(matches!(
            Chain::new([], KnownSize::Input(4)),
            Err(RfieldErr::MalformedChain(_))
        ));
        assert!(matches!(
            Chain::new([identity()], KnownSize::Output(0)),
            Err(RfieldErr::MalformedChain(_))
        ));
    }

    #[test]
    fn tensor_names() {
        let chain = Chain::new([identity().with_name("conv"), identity()], KnownSize::Input(1))
            .unwrap();

        assert_eq!(chain.tensor_name(0), "input");
        assert_eq!(chain.tensor_name(1), "conv");
        assert_eq!(chain.tensor_name(2), "layer_1");
    }
}
