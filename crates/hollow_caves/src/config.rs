//! # Cave Configuration
//!
//! Every tunable constant of the cave system, loadable from TOML.
//!
//! ```toml
//! neighborhood = "moore"
//! max_span = 32.0
//! girth_factor = 2.1
//! min_tunnel_width = 2
//! headroom = 1
//! save_debounce_ms = 5000
//! ```
//!
//! Missing keys fall back to `CaveConfig::default()`.

use std::path::Path;
use std::time::Duration;

use hollow_geometry::Neighborhood;
use serde::{Deserialize, Serialize};

use crate::error::{CaveError, CaveResult};

/// Configuration for scheduling and carving.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaveConfig {
    /// Which neighbours must be known before a cell is carved.
    pub neighborhood: Neighborhood,
    /// Inter-node distance at which tunnel girth shrinks to zero.
    pub max_span: f64,
    /// Base girth multiplier; biomes scale it further.
    pub girth_factor: f64,
    /// Segments narrower than this are dropped.
    pub min_tunnel_width: u32,
    /// Tunnel height is its width plus this.
    pub headroom: u32,
    /// Maximum number of voxels walked when placing a decoration.
    pub max_decoration_walk: u32,
    /// Coalescing window for deferred saves, in milliseconds.
    pub save_debounce_ms: u64,
    /// Lowest node elevation in enclosed worlds.
    pub enclosed_node_min: i32,
    /// Height of the node elevation band in enclosed worlds.
    pub enclosed_node_span: u32,
    /// Layers above the world floor that are never carved.
    pub bedrock_margin: i32,
}

impl Default for CaveConfig {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::Moore,
            max_span: 32.0,
            girth_factor: 2.1,
            min_tunnel_width: 2,
            headroom: 1,
            max_decoration_walk: 64,
            save_debounce_ms: 5_000,
            enclosed_node_min: 32,
            enclosed_node_span: 64,
            bedrock_margin: 1,
        }
    }
}

impl CaveConfig {
    /// Largest accepted `headroom`.
    pub const MAX_HEADROOM: u32 = 256;

    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::InvalidConfig` if the text does not parse or a
    /// value is out of range.
    pub fn from_toml_str(text: &str) -> CaveResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::InvalidConfig` if the file cannot be read or is
    /// invalid.
    pub fn from_file(path: &Path) -> CaveResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CaveError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Replaces the readiness neighbourhood.
    #[must_use]
    pub fn with_neighborhood(mut self, neighborhood: Neighborhood) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    /// The save debounce window.
    #[must_use]
    pub const fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `CaveError::InvalidConfig` naming the first bad value.
    pub fn validate(&self) -> CaveResult<()> {
        if !(self.max_span.is_finite() && self.max_span > 0.0) {
            return Err(CaveError::InvalidConfig(format!(
                "max_span must be positive, got {}",
                self.max_span
            )));
        }
        if !(self.girth_factor.is_finite() && self.girth_factor > 0.0) {
            return Err(CaveError::InvalidConfig(format!(
                "girth_factor must be positive, got {}",
                self.girth_factor
            )));
        }
        if self.min_tunnel_width == 0 {
            return Err(CaveError::InvalidConfig(
                "min_tunnel_width must be at least 1".to_string(),
            ));
        }
        if self.headroom > Self::MAX_HEADROOM {
            return Err(CaveError::InvalidConfig(format!(
                "headroom must be at most {}, got {}",
                Self::MAX_HEADROOM,
                self.headroom
            )));
        }
        if self.enclosed_node_span == 0 {
            return Err(CaveError::InvalidConfig(
                "enclosed_node_span must be at least 1".to_string(),
            ));
        }
        if self.bedrock_margin < 0 {
            return Err(CaveError::InvalidConfig(format!(
                "bedrock_margin must not be negative, got {}",
                self.bedrock_margin
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CaveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CaveConfig::from_toml_str(
            r#"
            neighborhood = "von_neumann"
            max_span = 40.0
            "#,
        )
        .unwrap();

        assert_eq!(config.neighborhood, Neighborhood::VonNeumann);
        assert!((config.max_span - 40.0).abs() < f64::EPSILON);
        assert_eq!(config.min_tunnel_width, CaveConfig::default().min_tunnel_width);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = CaveConfig::from_toml_str("max_span = -1.0").unwrap_err();
        assert!(matches!(err, CaveError::InvalidConfig(_)));

        let err = CaveConfig::from_toml_str("min_tunnel_width = 0").unwrap_err();
        assert!(matches!(err, CaveError::InvalidConfig(_)));

        let err = CaveConfig::from_toml_str("headroom = 4294967295").unwrap_err();
        assert!(matches!(err, CaveError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = CaveConfig::from_toml_str("max_span = [").unwrap_err();
        assert!(matches!(err, CaveError::InvalidConfig(_)));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = CaveConfig::default().with_neighborhood(Neighborhood::VonNeumann);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(CaveConfig::from_toml_str(&text).unwrap(), config);
    }
}
