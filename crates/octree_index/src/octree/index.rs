//! OctreeIndex - the canonical sparse cell index of one model.
//!
//! The index is a flat `CellId -> CellData` map. Only cells that hold data
//! (or were materialized while reaching such a cell) have entries; absence
//! below the max depth means "nothing here". The map is ordered by
//! `CellId`'s pre-order, so the entries below a cell are one range scan
//! away regardless of max depth.
//!
//! # Cell lifecycle
//!
//! ```text
//! UNALLOCATED --insert below--> LEAF --subdivide--> NODE
//! (no entry)                    (handles)           (no handles, 8 children)
//! ```
//!
//! Subdivision copies the leaf's handles into all 8 children, so every
//! element indexed at the coarser cell stays reachable at every finer cell.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::{CellData, CellId, Located, OctreeSpace, Search};
use crate::config::IndexConfig;
use crate::coverage::CellCoverage;
use crate::error::Result;
use crate::interner::{ElementHandle, ElementInterner, ElementKey};
use crate::model::ModelId;
use crate::storage::SpatialRow;

/// Summary counts of an index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexStats {
  /// Materialized cells (leaves + nodes).
  pub cells: usize,
  /// Leaf cells.
  pub leaves: usize,
  /// Node cells.
  pub nodes: usize,
  /// Distinct interned elements.
  pub elements: usize,
  /// Total (cell, element) memberships across all leaves.
  pub memberships: usize,
}

/// Canonical spatial index for one model.
///
/// Owns its cell map, element interner, max depth and world bounds, so
/// several independent indices can live in one process (one per
/// concurrently-active model). There is no internal locking: concurrent
/// writers must be serialized by the caller.
#[derive(Debug)]
pub struct OctreeIndex {
  pub(crate) model: ModelId,
  pub(crate) config: IndexConfig,
  pub(crate) space: OctreeSpace,
  pub(crate) cells: BTreeMap<CellId, CellData>,
  pub(crate) interner: ElementInterner,
}

impl OctreeIndex {
  /// Create an empty index (root entry only) for `model`.
  pub fn new(model: ModelId, config: IndexConfig) -> Result<Self> {
    let space = config.space()?;
    let mut cells = BTreeMap::new();
    cells.insert(CellId::ROOT, CellData::empty_leaf());
    Ok(Self {
      model,
      interner: ElementInterner::with_capacity(config.initial_capacity / 10),
      config,
      space,
      cells,
    })
  }

  /// Model this index belongs to.
  pub fn model(&self) -> ModelId {
    self.model
  }

  /// Configuration the index was built with.
  pub fn config(&self) -> &IndexConfig {
    &self.config
  }

  /// Address space (max depth and world bounds).
  pub fn space(&self) -> &OctreeSpace {
    &self.space
  }

  /// Element interner of this index.
  pub fn interner(&self) -> &ElementInterner {
    &self.interner
  }

  /// Key bound to `handle`.
  pub fn element_key(&self, handle: ElementHandle) -> Result<&ElementKey> {
    self.interner.lookup(handle)
  }

  /// Drop every cell and element, keeping only an empty root.
  pub fn clear(&mut self) {
    self.cells.clear();
    self.cells.insert(CellId::ROOT, CellData::empty_leaf());
    self.interner.clear();
  }

  /// Whether the index holds nothing but an empty root.
  pub fn is_empty(&self) -> bool {
    self.cells.len() == 1
      && self
        .cells
        .get(&CellId::ROOT)
        .and_then(CellData::handles)
        .is_some_and(BTreeSet::is_empty)
  }

  /// Number of materialized cells (including the root).
  pub fn len(&self) -> usize {
    self.cells.len()
  }

  /// Entry at exactly `cell`.
  pub fn get(&self, cell: CellId) -> Option<&CellData> {
    self.cells.get(&cell.canonical())
  }

  /// Iterate over all materialized cells in pre-order.
  pub fn cells(&self) -> impl Iterator<Item = (&CellId, &CellData)> {
    self.cells.iter()
  }

  /// Number of leaf cells.
  pub fn leaf_count(&self) -> usize {
    self.cells.values().filter(|data| data.is_leaf()).count()
  }

  /// Number of node cells.
  pub fn node_count(&self) -> usize {
    self.cells.len() - self.leaf_count()
  }

  /// Summary counts.
  pub fn stats(&self) -> IndexStats {
    let mut stats = IndexStats {
      cells: self.cells.len(),
      elements: self.interner.len(),
      ..IndexStats::default()
    };
    for data in self.cells.values() {
      match data {
        CellData::Node => stats.nodes += 1,
        CellData::Leaf(handles) => {
          stats.leaves += 1;
          stats.memberships += handles.len();
        }
      }
    }
    stats
  }

  // ===========================================================================
  // Insertion
  // ===========================================================================

  /// Record `handle` as occupying `cell`.
  ///
  /// Missing cells are materialized by subdividing the nearest existing
  /// ancestor down to `cell`. Inserting at a node inserts into all of its
  /// children. Re-inserting an existing membership is a no-op.
  ///
  /// A leaf with entries below it (bulk-loaded leaves have no ancestors) is
  /// subdivided first, so the element also reaches those finer cells.
  pub fn insert(&mut self, handle: ElementHandle, cell: CellId) -> Result<()> {
    let cell = cell.canonical();
    self.space.check_depth(cell)?;
    if !self.cells.contains_key(&cell) {
      self.materialize(cell)?;
    }
    if self.has_descendants(cell) && self.get(cell).is_some_and(CellData::is_leaf) {
      self.subdivide(cell)?;
    }

    if matches!(self.cells.get(&cell), Some(CellData::Node)) {
      // Only reachable when the cell was already subdivided by an earlier,
      // finer insert: the element fills the whole cell.
      for child in self.space.children(cell)? {
        self.insert(handle, child)?;
      }
      return Ok(());
    }

    match self.cells.entry(cell).or_insert_with(CellData::empty_leaf) {
      CellData::Leaf(handles) => {
        handles.insert(handle);
      }
      CellData::Node => {}
    }
    Ok(())
  }

  /// Intern `key` and insert it at `cell`.
  pub fn insert_element(&mut self, key: &ElementKey, cell: CellId) -> Result<ElementHandle> {
    let handle = self.interner.get_or_assign(key);
    self.insert(handle, cell)?;
    Ok(handle)
  }

  /// Intern `key` and insert it at every cell `coverage` reports for `shape`.
  ///
  /// Returns the number of cells inserted.
  pub fn insert_shape<S, C>(&mut self, key: &ElementKey, shape: &S, coverage: &C) -> Result<usize>
  where
    S: ?Sized,
    C: CellCoverage<S> + ?Sized,
  {
    let covered = coverage.cover(shape, &self.space)?;
    let handle = self.interner.get_or_assign(key);
    for covered_cell in &covered {
      self.insert(handle, covered_cell.cell)?;
    }
    debug!(element = %key, cells = covered.len(), "indexed shape");
    Ok(covered.len())
  }

  /// Create the entries needed for `cell` to exist.
  ///
  /// Walks toward the root until an existing ancestor is found, then
  /// subdivides downward one level at a time.
  fn materialize(&mut self, cell: CellId) -> Result<()> {
    let mut missing: SmallVec<[CellId; 8]> = SmallVec::new();
    let mut cursor = cell;
    while !self.cells.contains_key(&cursor) {
      missing.push(cursor);
      cursor = cursor.parent()?;
    }
    for next in missing.into_iter().rev() {
      self.subdivide(next.parent()?)?;
    }
    Ok(())
  }

  /// Turn `parent` into a node whose children inherit its handles.
  ///
  /// Children that already exist, or that have entries below them (possible
  /// after a bulk load, which installs leaves without their ancestors),
  /// receive the inherited handles through [`insert`](Self::insert) so they
  /// reach every finer entry.
  fn subdivide(&mut self, parent: CellId) -> Result<()> {
    let children = self.space.children(parent)?;
    let inherited = match self.cells.insert(parent, CellData::Node) {
      Some(CellData::Leaf(handles)) => handles,
      _ => BTreeSet::new(),
    };
    trace!(cell = %parent, inherited = inherited.len(), "subdivide");
    for child in children {
      if self.cells.contains_key(&child) || self.has_descendants(child) {
        self
          .cells
          .entry(child)
          .or_insert_with(CellData::empty_leaf);
        for &handle in &inherited {
          self.insert(handle, child)?;
        }
      } else {
        self.cells.insert(child, CellData::Leaf(inherited.clone()));
      }
    }
    Ok(())
  }

  /// Whether any entry lies strictly below `cell`.
  fn has_descendants(&self, cell: CellId) -> bool {
    self
      .cells
      .range((Bound::Excluded(cell), Bound::Unbounded))
      .next()
      .is_some_and(|(next, _)| cell.is_ancestor_of(next))
  }

  // ===========================================================================
  // Lookup
  // ===========================================================================

  /// Locate `cell`, searching ancestors and then descendants.
  pub fn locate(&self, cell: CellId) -> Located {
    self.locate_with(cell, Search::ALL)
  }

  /// Locate `cell` with explicit search directions.
  ///
  /// 1. Cells deeper than max depth are `NotFound`.
  /// 2. An exact entry is `NodeFound`.
  /// 3. Otherwise the nearest existing ancestor below the root is
  ///    `FoundAncestor`. The root always exists and is never an ancestor hit.
  /// 4. Otherwise, above max depth, existing descendants are
  ///    `FoundDescendant`. A descendant node is a hit and is not expanded.
  pub fn locate_with(&self, cell: CellId, search: Search) -> Located {
    let cell = cell.canonical();
    let max_depth = self.space.max_depth();
    if cell.level() > max_depth {
      return Located::NotFound;
    }
    if self.cells.contains_key(&cell) {
      return Located::NodeFound(cell);
    }

    if search.ancestors {
      let mut cursor = cell;
      while let Ok(parent) = cursor.parent() {
        if parent.is_root() {
          break;
        }
        if self.cells.contains_key(&parent) {
          return Located::FoundAncestor(parent);
        }
        cursor = parent;
      }
    }

    if search.descendants && cell.level() < max_depth {
      let mut hits = SmallVec::new();
      self.find_descendants(cell, &mut hits);
      if !hits.is_empty() {
        return Located::FoundDescendant(hits);
      }
    }
    Located::NotFound
  }

  /// Topmost existing entries strictly below `cell`, in pre-order.
  ///
  /// Descendants form one contiguous range after `cell`; entries below a hit
  /// are skipped rather than reported.
  fn find_descendants(&self, cell: CellId, hits: &mut SmallVec<[CellId; 8]>) {
    let below = self
      .cells
      .range((Bound::Excluded(cell), Bound::Unbounded))
      .map(|(id, _)| *id)
      .take_while(|id| cell.is_ancestor_of(id));
    for id in below {
      if hits.last().is_some_and(|hit: &CellId| hit.is_ancestor_of(&id)) {
        continue;
      }
      hits.push(id);
    }
  }

  /// Handles of every element touching `cell`.
  ///
  /// - exact leaf: its handles
  /// - exact node: handles of every leaf below it
  /// - ancestor: the ancestor's handles
  /// - descendants: the union over all descendant hits
  pub fn elements_touching(&self, cell: CellId) -> BTreeSet<ElementHandle> {
    let mut out = BTreeSet::new();
    for id in self.locate(cell).ids() {
      self.collect_handles_below(*id, &mut out);
    }
    out
  }

  fn collect_handles_below(&self, cell: CellId, out: &mut BTreeSet<ElementHandle>) {
    match self.cells.get(&cell) {
      Some(CellData::Leaf(handles)) => out.extend(handles.iter().copied()),
      Some(CellData::Node) => {
        if let Ok(children) = self.space.children(cell) {
          for child in children {
            self.collect_handles_below(child, out);
          }
        }
      }
      None => {}
    }
  }

  // ===========================================================================
  // Export
  // ===========================================================================

  /// One persisted row per (element, leaf cell) membership, ordered by cell
  /// string then element.
  pub fn to_rows(&self) -> Result<Vec<SpatialRow>> {
    let mut rows = Vec::new();
    for (cell, data) in &self.cells {
      if let CellData::Leaf(handles) = data {
        for &handle in handles {
          rows.push(SpatialRow::new(self.interner.lookup(handle)?, *cell));
        }
      }
    }
    rows.sort();
    Ok(rows)
  }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
