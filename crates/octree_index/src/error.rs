//! Error type shared by every index operation.

use std::path::PathBuf;

use glam::DVec3;
use thiserror::Error;

use crate::interner::ElementHandle;
use crate::model::ModelId;

/// Result alias used throughout the crate.
pub type Result<T, E = IndexError> = std::result::Result<T, E>;

/// Errors raised by the codec, the index and the storage boundary.
///
/// `MalformedCellId` and `DepthExceeded` are caller misuse and fail the single
/// operation. `StorageLoadFailure` is fatal to the build in progress: the
/// partially populated index must be discarded. `UnknownHandle` only surfaces
/// when the append-only interner invariant is broken.
#[derive(Debug, Error)]
pub enum IndexError {
  /// A cell identifier string did not parse to a valid octant path.
  #[error("malformed cell id {input:?}: {reason}")]
  MalformedCellId { input: String, reason: &'static str },

  /// A cell operation would leave the `0..=max_depth` level range.
  #[error("cell level {level} is outside the allowed range 0..={max_depth}")]
  DepthExceeded { level: i32, max_depth: u8 },

  /// The interner never assigned this handle.
  #[error("unknown element handle {0}")]
  UnknownHandle(ElementHandle),

  /// An element key string did not parse.
  #[error("malformed element key {input:?}")]
  MalformedElementKey { input: String },

  /// A point lies outside the world bounding box.
  #[error("point {point} lies outside the world bounds")]
  OutsideWorld { point: DVec3 },

  /// Loading the persisted spatial-index table failed.
  #[error("failed to load spatial index for model {model}: {context}")]
  StorageLoadFailure { model: ModelId, context: String },

  /// Configuration values are unusable.
  #[error("invalid index configuration: {0}")]
  InvalidConfig(String),

  /// Reading or writing a file failed.
  #[error("i/o error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl IndexError {
  /// Shorthand for a storage failure with context.
  pub fn storage(model: ModelId, context: impl Into<String>) -> Self {
    Self::StorageLoadFailure {
      model,
      context: context.into(),
    }
  }

  /// Whether the error indicates caller misuse rather than a data problem.
  pub fn is_misuse(&self) -> bool {
    matches!(
      self,
      Self::MalformedCellId { .. } | Self::DepthExceeded { .. } | Self::OutsideWorld { .. }
    )
  }
}
