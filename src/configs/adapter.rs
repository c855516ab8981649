use crate::{
    Result, RfieldErr,
    chain::{Chain, Direction, LayerSpec, Wings},
    configs::{ChainConfig, DirectionConfig, LayerConfig, StrideConfig},
    rational::Rational,
};

/// Validates user configs and turns them into chains.
#[derive(Debug, Default)]
pub struct Adapter;

impl Adapter {
    pub fn new() -> Self {
        Self
    }

    /// Converts a chain description into a `Chain`.
    ///
    /// # Arguments
    /// * `config` - The user's chain description.
    ///
    /// # Returns
    /// The chain or `MalformedChain` describing the first violated constraint.
    pub fn adapt(&self, config: &ChainConfig) -> Result<Chain> {
        let (input, output) = self.validate_sizes(config)?;

        let layers = config
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| self.adapt_layer(i, layer))
            .collect::<Result<Vec<_>>>()?;

        Chain::from_sizes(layers, input, output)
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn validate_sizes(&self, config: &ChainConfig) -> Result<(Option<usize>, Option<usize>)> {
        if config.input_size.is_some() == config.output_size.is_some() {
            return Err(RfieldErr::MalformedChain(
                "exactly one of input_size and output_size is required".into(),
            ));
        }

        if config.layers.is_empty() {
            return Err(RfieldErr::MalformedChain(
                "chain must have at least one layer".into(),
            ));
        }

        let input = config
            .input_size
            .map(|n| self.count("input_size", n))
            .transpose()?;
        let output = config
            .output_size
            .map(|n| self.count("output_size", n))
            .transpose()?;

        Ok((input, output))
    }

    fn count(&self, what: &str, value: i64) -> Result<usize> {
        usize::try_from(value)
            .map_err(|_| RfieldErr::MalformedChain(format!("{what} must not be negative, got {value}")))
    }

    // -------------------------------------------------------------------------
    // Adaptation
    // -------------------------------------------------------------------------

    fn adapt_layer(&self, i: usize, layer: &LayerConfig) -> Result<LayerSpec> {
        let stride = self.adapt_stride(i, &layer.stride)?;
        let wings = self.adapt_wings(i, layer)?;
        let left_pad = self.count(&format!("layer {i}: left_pad"), layer.left_pad)?;
        let right_pad = self.count(&format!("layer {i}: right_pad"), layer.right_pad)?;

        let spec = LayerSpec::new(
            self.adapt_direction(layer.direction),
            stride,
            wings,
            (left_pad, right_pad),
        )
        .map_err(|e| RfieldErr::MalformedChain(format!("layer {i}: {e}")))?;

        Ok(match &layer.name {
            Some(name) => spec.with_name(name.clone()),
            None => spec,
        })
    }

    fn adapt_direction(&self, direction: DirectionConfig) -> Direction {
        match direction {
            DirectionConfig::Upsampling => Direction::Upsampling,
            DirectionConfig::Downsampling => Direction::Downsampling,
        }
    }

    fn adapt_stride(&self, i: usize, stride: &StrideConfig) -> Result<Rational> {
        let parsed = match stride {
            StrideConfig::Integer(n) => Rational::new(*n, 1),
            // The shortest round-trip text of a float is what the user wrote.
            StrideConfig::Decimal(x) => x.to_string().parse(),
            StrideConfig::Text(s) => s.parse(),
        };

        parsed.map_err(|e| RfieldErr::MalformedChain(format!("layer {i}: invalid stride: {e}")))
    }

    fn adapt_wings(&self, i: usize, layer: &LayerConfig) -> Result<Wings> {
        match (layer.filter_size, layer.left_wing, layer.right_wing) {
            (Some(size), None, None) => {
                let size = self.count(&format!("layer {i}: filter_size"), size)?;
                Wings::from_filter_size(size)
                    .map_err(|e| RfieldErr::MalformedChain(format!("layer {i}: {e}")))
            }
            (None, Some(left), Some(right)) => Ok(Wings::new(
                self.count(&format!("layer {i}: left_wing"), left)?,
                self.count(&format!("layer {i}: right_wing"), right)?,
            )),
            _ => Err(RfieldErr::MalformedChain(format!(
                "layer {i}: give either filter_size or both left_wing and right_wing"
            ))),
        }
    }
}
