use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, RfieldErr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionConfig {
    Upsampling,
    Downsampling,
}

/// A stride as written by the user: `2`, `1.5`, `"3/2"` or `"1.5"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrideConfig {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

/// One layer as written by the user. Sizes are signed so that negative values can be
/// reported instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub direction: DirectionConfig,
    pub stride: StrideConfig,
    #[serde(default)]
    pub filter_size: Option<i64>,
    #[serde(default)]
    pub left_wing: Option<i64>,
    #[serde(default)]
    pub right_wing: Option<i64>,
    #[serde(default)]
    pub left_pad: i64,
    #[serde(default)]
    pub right_pad: i64,
}

/// A whole chain description, exactly one of the sizes must be given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    #[serde(default)]
    pub input_size: Option<i64>,
    #[serde(default)]
    pub output_size: Option<i64>,
    pub layers: Vec<LayerConfig>,
}

impl ChainConfig {
    /// Parses a chain description from JSON text.
    ///
    /// # Returns
    /// The config or `MalformedChain` if the text is not a valid description.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RfieldErr::MalformedChain(format!("invalid JSON: {e}")))
    }

    /// Reads and parses a chain description from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RfieldErr::MalformedChain(format!("cannot read '{}': {e}", path.display()))
        })?;

        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_stride_form() {
        let config = ChainConfig::from_json(
            r#"{
                "output_size": 5,
                "layers": [
                    { "direction": "downsampling", "stride": 2, "filter_size": 3 },
                    { "direction": "upsampling", "stride": 1.5, "left_wing": 0, "right_wing": 1 },
                    { "direction": "upsampling", "stride": "3/2", "filter_size": 1, "left_pad": 1 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.input_size, None);
        assert_eq!(config.output_size, Some(5));
        assert_eq!(config.layers[0].stride, StrideConfig::Integer(2));
        assert_eq!(config.layers[1].stride, StrideConfig::Decimal(1.5));
        assert_eq!(config.layers[2].stride, StrideConfig::Text("3/2".into()));
        assert_eq!(config.layers[1].direction, DirectionConfig::Upsampling);
        assert_eq!(config.layers[2].left_pad, 1);
        assert_eq!(config.layers[2].right_pad, 0);
    }

    #[test]
    fn rejects_unknown_fields_and_missing_direction() {
        let res = ChainConfig::from_json(
            r#"{ "input_size": 1, "layers": [ { "direction": "downsampling", "stride": 1, "wings": 2 } ] }"#,
        );
        assert!(matches!(res, Err(RfieldErr::MalformedChain(_))));

        let res = ChainConfig::from_json(r#"{ "input_size": 1, "layers": [ { "stride": 1 } ] }"#);
        assert!(matches!(res, Err(RfieldErr::MalformedChain(_))));
    }
}
