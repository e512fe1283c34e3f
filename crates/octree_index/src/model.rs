//! ModelId - identifier of one logical building model.
//!
//! Every canonical index belongs to exactly one model. Switching the active
//! model invalidates the index and rebuilds it from storage.

use std::fmt;

/// Opaque model identifier (one federated model in the backing store).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct ModelId(u32);

impl ModelId {
  /// Wrap a raw model number.
  pub const fn new(raw: u32) -> Self {
    Self(raw)
  }

  /// Get the raw model number.
  pub fn raw(&self) -> u32 {
    self.0
  }
}

impl fmt::Display for ModelId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<u32> for ModelId {
  fn from(raw: u32) -> Self {
    Self(raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn model_id_round_trips_raw_value() {
    let id = ModelId::new(42);
    assert_eq!(id.raw(), 42);
    assert_eq!(ModelId::from(42), id);
    assert_eq!(id.to_string(), "42");
  }
}
