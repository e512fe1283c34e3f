//! Index configuration, loaded from TOML.
//!
//! ```toml
//! max_depth = 6
//! initial_capacity = 100000
//!
//! [world]
//! min = [0.0, 0.0, 0.0]
//! max = [100.0, 100.0, 30.0]
//! ```

use std::path::Path;

use glam::DVec3;
use serde::Deserialize;

use crate::error::{IndexError, Result};
use crate::octree::{DAabb3, OctreeSpace, MAX_KEY_DEPTH};

/// Settings for one canonical index.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
  /// Deepest level cells may be created at (1..=20).
  #[serde(default = "default_max_depth")]
  pub max_depth: u8,
  /// Expected number of cells; the element interner is presized to a tenth
  /// of it.
  #[serde(default = "default_initial_capacity")]
  pub initial_capacity: usize,
  /// World bounding box covered by the root cell.
  #[serde(default = "default_world")]
  pub world: DAabb3,
}

fn default_max_depth() -> u8 {
  6
}

fn default_initial_capacity() -> usize {
  100_000
}

fn default_world() -> DAabb3 {
  DAabb3::new(DVec3::ZERO, DVec3::ONE)
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      max_depth: default_max_depth(),
      initial_capacity: default_initial_capacity(),
      world: default_world(),
    }
  }
}

impl IndexConfig {
  /// Load and validate configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path).map_err(|source| IndexError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Parse and validate configuration from TOML text.
  pub fn from_toml_str(content: &str) -> Result<Self> {
    let config: IndexConfig =
      toml::from_str(content).map_err(|e| IndexError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Check depth range and world extent.
  pub fn validate(&self) -> Result<()> {
    if self.max_depth == 0 || self.max_depth > MAX_KEY_DEPTH {
      return Err(IndexError::InvalidConfig(format!(
        "max_depth must be in 1..={MAX_KEY_DEPTH}, got {}",
        self.max_depth
      )));
    }
    let (min, max) = (self.world.min, self.world.max);
    if !min.cmplt(max).all() {
      return Err(IndexError::InvalidConfig(format!(
        "world min {min} must be below max {max} on every axis"
      )));
    }
    Ok(())
  }

  /// Address space described by this configuration.
  pub fn space(&self) -> Result<OctreeSpace> {
    self.validate()?;
    OctreeSpace::new(self.max_depth, self.world)
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
