//! CellData - what the index stores per materialized cell.

use std::collections::BTreeSet;

use crate::interner::ElementHandle;

/// Cell tag, with the numeric codes used by downstream reporting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CellKind {
  /// Fully subdivided cell; holds no handles itself.
  Node,
  /// Cell holding element handles directly.
  Leaf,
  /// Overlay-only: original query cell resolved through an ancestor.
  LeafWithAncestor,
  /// Overlay-only: original query cell resolved through descendants.
  LeafWithDescendant,
}

impl CellKind {
  /// Stable numeric code (0, 1, 8, 9).
  pub fn code(&self) -> u8 {
    match self {
      CellKind::Node => 0,
      CellKind::Leaf => 1,
      CellKind::LeafWithAncestor => 8,
      CellKind::LeafWithDescendant => 9,
    }
  }

  /// Inverse of [`code`](Self::code).
  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(CellKind::Node),
      1 => Some(CellKind::Leaf),
      8 => Some(CellKind::LeafWithAncestor),
      9 => Some(CellKind::LeafWithDescendant),
      _ => None,
    }
  }

  /// Whether the kind carries element handles.
  pub fn is_leaf(&self) -> bool {
    !matches!(self, CellKind::Node)
  }
}

/// Contents of one canonical-index cell.
///
/// A `Node` never carries handles; its 8 children are materialized entries.
/// Handles in a `Leaf` are unique and iterate in ascending order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CellData {
  /// Subdivided cell.
  Node,
  /// Cell holding element handles.
  Leaf(BTreeSet<ElementHandle>),
}

impl CellData {
  /// An empty leaf.
  pub fn empty_leaf() -> Self {
    CellData::Leaf(BTreeSet::new())
  }

  /// Tag of this cell.
  pub fn kind(&self) -> CellKind {
    match self {
      CellData::Node => CellKind::Node,
      CellData::Leaf(_) => CellKind::Leaf,
    }
  }

  /// Whether this cell is a leaf.
  pub fn is_leaf(&self) -> bool {
    matches!(self, CellData::Leaf(_))
  }

  /// Handles held by a leaf, `None` for a node.
  pub fn handles(&self) -> Option<&BTreeSet<ElementHandle>> {
    match self {
      CellData::Leaf(handles) => Some(handles),
      CellData::Node => None,
    }
  }
}
