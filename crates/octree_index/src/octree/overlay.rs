//! UserOverlay - transient per-query index layered over a canonical index.
//!
//! The overlay classifies query cells against the canonical index and
//! records the resolved cells for its own (user geometry) elements. The
//! canonical index is only borrowed, never mutated, so any number of
//! overlays may read the same index at once.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{CellId, CellKind, GridBounds, Located, OctreeIndex, Search};
use crate::coverage::CellCoverage;
use crate::error::Result;
use crate::interner::{ElementHandle, ElementInterner, ElementKey};

/// One exported (element, cell) membership of an overlay.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OverlayRecord {
  /// Scoped element key.
  pub element: ElementKey,
  /// Cell string form.
  pub cell: String,
  /// Cell bounds in finest-level grid units.
  pub bounds: GridBounds,
  /// Cell level.
  pub depth: u8,
  /// Leaf, LeafWithAncestor or LeafWithDescendant.
  pub kind: CellKind,
}

#[derive(Clone, Debug)]
struct OverlayCell {
  kind: CellKind,
  handles: BTreeSet<ElementHandle>,
}

/// Scoped index for one query, resolved against a canonical index.
#[derive(Debug)]
pub struct UserOverlay<'a> {
  index: &'a OctreeIndex,
  cells: HashMap<CellId, OverlayCell>,
  interner: ElementInterner,
}

impl<'a> UserOverlay<'a> {
  /// Empty overlay over `index`.
  pub fn new(index: &'a OctreeIndex) -> Self {
    Self {
      index,
      cells: HashMap::new(),
      interner: ElementInterner::new(),
    }
  }

  /// The canonical index this overlay resolves against.
  pub fn index(&self) -> &'a OctreeIndex {
    self.index
  }

  /// Handle for a scoped element, assigned on first use.
  pub fn intern(&mut self, key: &ElementKey) -> ElementHandle {
    self.interner.get_or_assign(key)
  }

  /// Number of overlay cells.
  pub fn len(&self) -> usize {
    self.cells.len()
  }

  /// Whether nothing has been recorded.
  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  /// Kind and handles recorded at `cell`.
  pub fn get(&self, cell: CellId) -> Option<(CellKind, &BTreeSet<ElementHandle>)> {
    self
      .cells
      .get(&cell.canonical())
      .map(|entry| (entry.kind, &entry.handles))
  }

  /// Record `handle` for query cell `cell`.
  ///
  /// - `NotFound`: a fresh leaf at `cell`.
  /// - `NodeFound` on a canonical leaf: `cell` itself.
  /// - `NodeFound` on a canonical node: each of its 8 children, with
  ///   descendant search disabled.
  /// - `FoundAncestor` / `FoundDescendant`: every located cell, plus `cell`
  ///   tagged with the outcome when `keep_original` is set.
  ///
  /// Returns the outcome of classifying `cell`. Cells deeper than the max
  /// depth fail with `DepthExceeded`.
  pub fn insert_scoped(
    &mut self,
    handle: ElementHandle,
    cell: CellId,
    keep_original: bool,
  ) -> Result<Located> {
    let cell = cell.canonical();
    self.index.space().check_depth(cell)?;
    self.insert_with(handle, cell, keep_original, Search::ALL)
  }

  fn insert_with(
    &mut self,
    handle: ElementHandle,
    cell: CellId,
    keep_original: bool,
    search: Search,
  ) -> Result<Located> {
    let located = self.index.locate_with(cell, search);
    match &located {
      Located::NotFound => self.record(cell, CellKind::Leaf, handle),
      Located::NodeFound(id) => match self.index.get(*id).map(|data| data.kind()) {
        Some(CellKind::Node) => {
          for child in self.index.space().children(*id)? {
            self.insert_with(handle, child, keep_original, Search::NO_DESCENDANTS)?;
          }
        }
        _ => self.record(*id, CellKind::Leaf, handle),
      },
      Located::FoundAncestor(_) | Located::FoundDescendant(_) => {
        if keep_original {
          let kind = if matches!(located, Located::FoundAncestor(_)) {
            CellKind::LeafWithAncestor
          } else {
            CellKind::LeafWithDescendant
          };
          self.record(cell, kind, handle);
        }
        for id in located.ids() {
          self.record(*id, CellKind::Leaf, handle);
        }
      }
    }
    Ok(located)
  }

  /// Add `handle` at `cell`; an existing entry keeps its kind.
  fn record(&mut self, cell: CellId, kind: CellKind, handle: ElementHandle) {
    self
      .cells
      .entry(cell)
      .or_insert_with(|| OverlayCell {
        kind,
        handles: BTreeSet::new(),
      })
      .handles
      .insert(handle);
  }

  /// Intern `key` and record it for query cell `cell`.
  pub fn insert_element(
    &mut self,
    key: &ElementKey,
    cell: CellId,
    keep_original: bool,
  ) -> Result<Located> {
    let handle = self.intern(key);
    self.insert_scoped(handle, cell, keep_original)
  }

  /// Intern `key` and record it for every cell `coverage` reports for
  /// `shape`. Returns the number of query cells.
  pub fn insert_shape<S, C>(
    &mut self,
    key: &ElementKey,
    shape: &S,
    coverage: &C,
    keep_original: bool,
  ) -> Result<usize>
  where
    S: ?Sized,
    C: CellCoverage<S> + ?Sized,
  {
    let covered = coverage.cover(shape, self.index.space())?;
    let handle = self.intern(key);
    for covered_cell in &covered {
      self.insert_scoped(handle, covered_cell.cell, keep_original)?;
    }
    Ok(covered.len())
  }

  /// Export every (cell, element) membership, ordered by cell string then
  /// handle.
  #[tracing::instrument(skip_all, name = "overlay::collect")]
  pub fn collect(&self) -> Result<Vec<OverlayRecord>> {
    let space = self.index.space();
    let mut entries: Vec<(String, CellId, &OverlayCell)> = self
      .cells
      .iter()
      .map(|(cell, entry)| (cell.to_string(), *cell, entry))
      .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut records = Vec::new();
    for (cell_str, cell, entry) in entries {
      let bounds = space.decode_bounds(cell)?;
      for &handle in &entry.handles {
        records.push(OverlayRecord {
          element: self.interner.lookup(handle)?.clone(),
          cell: cell_str.clone(),
          bounds,
          depth: cell.level(),
          kind: entry.kind,
        });
      }
    }
    debug!(cells = self.cells.len(), records = records.len(), "collected overlay");
    Ok(records)
  }

  /// Consume the overlay into its records.
  pub fn drain(self) -> Result<Vec<OverlayRecord>> {
    self.collect()
  }
}

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;
