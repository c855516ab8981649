use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::{
    chain::{Direction, Side},
    rational::Rational,
};

/// The result type used across the whole crate.
pub type Result<T> = std::result::Result<T, RfieldErr>;

/// Every way a chain solve can fail. None of them are recoverable within the same solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RfieldErr {
    /// A rational operation divided by the zero fraction.
    DivisionByZero,
    /// A fraction that should have been a whole count was not.
    NonIntegral { value: Rational },
    /// After global scaling a tensor's stride or spacing is still fractional.
    NonIntegralChain {
        tensor: usize,
        what: &'static str,
        value: Rational,
    },
    /// A per-layer size inversion yields a fractional or sub-1 size.
    IncompatibleGeometry {
        layer: usize,
        direction: Direction,
        solving: Side,
        value: Rational,
    },
    /// Exact arithmetic left the 64-bit range, at the given layer when known.
    Overflow { layer: Option<usize> },
    /// The chain description violates a structural invariant.
    MalformedChain(String),
}

impl RfieldErr {
    /// Attributes an `Overflow` without a location to `layer`, other errors pass through.
    pub(crate) fn at_layer(self, layer: usize) -> Self {
        match self {
            RfieldErr::Overflow { layer: None } => RfieldErr::Overflow { layer: Some(layer) },
            e => e,
        }
    }
}

impl Display for RfieldErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RfieldErr::DivisionByZero => write!(f, "division by the zero fraction"),
            RfieldErr::NonIntegral { value } => {
                write!(f, "expected a whole number, got {value}")
            }
            RfieldErr::NonIntegralChain {
                tensor,
                what,
                value,
            } => write!(
                f,
                "tensor {tensor}: {what} is {value} after global scaling, expected a positive integer"
            ),
            RfieldErr::IncompatibleGeometry {
                layer,
                direction,
                solving,
                value,
            } => write!(
                f,
                "layer {layer} ({direction}): solving for its {solving} size gives {value}, \
                 expected a whole number >= 1"
            ),
            RfieldErr::Overflow { layer: Some(layer) } => {
                write!(f, "layer {layer}: arithmetic overflow")
            }
            RfieldErr::Overflow { layer: None } => write!(f, "arithmetic overflow"),
            RfieldErr::MalformedChain(msg) => write!(f, "malformed chain: {msg}"),
        }
    }
}

impl Error for RfieldErr {}
