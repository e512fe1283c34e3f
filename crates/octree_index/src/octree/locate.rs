//! Locate outcomes and search options.

use smallvec::SmallVec;

use super::CellId;

/// Result of locating a cell in an index.
///
/// Exactly one outcome is produced per lookup. Ancestor matches take priority
/// over descendant matches (coarser containment wins).
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Located {
  /// An entry exists exactly at the queried cell.
  NodeFound(CellId),
  /// The nearest existing (non-root) ancestor of the queried cell.
  FoundAncestor(CellId),
  /// Existing cells below the queried cell.
  FoundDescendant(SmallVec<[CellId; 8]>),
  /// Nothing within the configured depth.
  NotFound,
}

impl Located {
  /// Cells this outcome resolved to (empty for `NotFound`).
  pub fn ids(&self) -> &[CellId] {
    match self {
      Located::NodeFound(id) | Located::FoundAncestor(id) => std::slice::from_ref(id),
      Located::FoundDescendant(ids) => ids,
      Located::NotFound => &[],
    }
  }

  /// Whether the lookup found anything.
  pub fn is_found(&self) -> bool {
    !matches!(self, Located::NotFound)
  }
}

/// Which directions `locate` may search when there is no exact entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Search {
  /// Walk parents toward the root.
  pub ancestors: bool,
  /// Walk children toward max depth.
  pub descendants: bool,
}

impl Search {
  /// Search both directions (ancestors first).
  pub const ALL: Self = Self {
    ancestors: true,
    descendants: true,
  };

  /// Ancestors only; used below a known node where descendant
  /// reclassification is meaningless.
  pub const NO_DESCENDANTS: Self = Self {
    ancestors: true,
    descendants: false,
  };

  /// Exact match only.
  pub const EXACT: Self = Self {
    ancestors: false,
    descendants: false,
  };
}

impl Default for Search {
  fn default() -> Self {
    Self::ALL
  }
}
