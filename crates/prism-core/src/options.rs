//! Configuration options for prism.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PrismError, Result};

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Maximum live entries in the render target cache.
    pub render_target_cache_capacity: usize,

    /// Maximum live entries in the shader program cache.
    pub program_cache_capacity: usize,

    /// Number of texture binding slots available to passes.
    pub texture_units: u32,

    /// Shadow map resolution (square).
    pub shadow_map_size: u32,

    /// Number of horizontal+vertical blur iterations.
    pub blur_passes: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            render_target_cache_capacity: 16,
            program_cache_capacity: 32,
            texture_units: 16,
            shadow_map_size: 2048,
            blur_passes: 1,
        }
    }
}

impl Options {
    /// Checks that every capacity is usable.
    pub fn validate(&self) -> Result<()> {
        if self.render_target_cache_capacity == 0 {
            return Err(PrismError::InvalidOptions(
                "render_target_cache_capacity must be at least 1".into(),
            ));
        }
        if self.program_cache_capacity == 0 {
            return Err(PrismError::InvalidOptions(
                "program_cache_capacity must be at least 1".into(),
            ));
        }
        if self.texture_units == 0 {
            return Err(PrismError::InvalidOptions(
                "texture_units must be at least 1".into(),
            ));
        }
        if self.shadow_map_size == 0 {
            return Err(PrismError::InvalidOptions(
                "shadow_map_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parses and validates options from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Options = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serializes the options as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        Options::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = Options::from_json_str(r#"{ "texture_units": 8 }"#).unwrap();
        assert_eq!(options.texture_units, 8);
        assert_eq!(
            options.render_target_cache_capacity,
            Options::default().render_target_cache_capacity
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Options::from_json_str(r#"{ "program_cache_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, PrismError::InvalidOptions(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = Options::from_json_str("{ texture_units: }").unwrap_err();
        assert!(matches!(err, PrismError::JsonError(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let options = Options {
            blur_passes: 3,
            ..Default::default()
        };
        let json = options.to_json_string().unwrap();
        assert_eq!(Options::from_json_str(&json).unwrap(), options);
    }

    #[test]
    fn test_missing_file() {
        let err = Options::from_json_file("/nonexistent/prism.json").unwrap_err();
        assert!(matches!(err, PrismError::IoError(_)));
    }
}
