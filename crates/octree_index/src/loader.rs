//! Bulk loading of a canonical index from persisted rows.
//!
//! Rows are the finished output of an earlier indexing run, so they are
//! installed as leaves directly: no subdivision, no ancestor entries.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use tracing::{info, warn};

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::interner::ElementKey;
use crate::model::ModelId;
use crate::octree::{CellData, CellId, OctreeIndex};
use crate::storage::SpatialTable;

/// Counts from one bulk load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
  /// Rows read.
  pub rows: usize,
  /// Distinct (canonical) cells installed.
  pub cells: usize,
  /// Distinct elements interned.
  pub elements: usize,
}

/// Populate `index` from every row `table` holds for the index's model.
///
/// Each distinct element is interned once and each distinct cell becomes one
/// leaf holding the handles of all its elements. Any bad row fails the whole
/// load with `StorageLoadFailure`; the partially populated index must then
/// be discarded.
#[tracing::instrument(skip_all, name = "loader::bulk_load", fields(model = %index.model()))]
pub fn bulk_load<T>(index: &mut OctreeIndex, table: &T) -> Result<LoadStats>
where
  T: SpatialTable + ?Sized,
{
  let model = index.model;
  let rows = table.rows(model).map_err(|e| match e {
    IndexError::StorageLoadFailure { .. } => e,
    other => IndexError::storage(model, format!("reading rows: {other}")),
  })?;

  let mut keys: BTreeMap<String, ElementKey> = BTreeMap::new();
  let mut cells: HashSet<CellId> = HashSet::new();
  let mut stats = LoadStats {
    rows: rows.len(),
    ..LoadStats::default()
  };
  let elements_before = index.interner.len();

  for (number, row) in rows.iter().enumerate() {
    let bad_row = |e: IndexError| IndexError::storage(model, format!("row {}: {e}", number + 1));

    let cell = row.parse_cell().map_err(bad_row)?.canonical();
    index.space.check_depth(cell).map_err(bad_row)?;

    let key = match keys.entry(row.element.clone()) {
      Entry::Occupied(slot) => slot.into_mut(),
      Entry::Vacant(slot) => slot.insert(row.parse_element().map_err(bad_row)?),
    };
    let handle = index.interner.get_or_assign(key);
    cells.insert(cell);

    match index.cells.entry(cell).or_insert_with(CellData::empty_leaf) {
      CellData::Leaf(handles) => {
        handles.insert(handle);
      }
      CellData::Node => {
        return Err(bad_row(IndexError::MalformedCellId {
          input: row.cell.clone(),
          reason: "cell is already subdivided",
        }));
      }
    }
  }

  stats.cells = cells.len();
  stats.elements = index.interner.len() - elements_before;
  info!(
    rows = stats.rows,
    cells = stats.cells,
    elements = stats.elements,
    "loaded spatial index"
  );
  Ok(stats)
}

impl OctreeIndex {
  /// Build a fresh index for `model` from `table`.
  pub fn load<T>(model: ModelId, config: IndexConfig, table: &T) -> Result<Self>
  where
    T: SpatialTable + ?Sized,
  {
    let mut index = Self::new(model, config)?;
    bulk_load(&mut index, table)?;
    Ok(index)
  }

  /// Make `model` the active model, rebuilding from `table` if needed.
  ///
  /// Rebuilds when the model changes or the index is empty; returns whether
  /// a rebuild happened. A failed rebuild leaves the index cleared.
  #[tracing::instrument(skip_all, name = "index::activate", fields(model = %model))]
  pub fn activate<T>(&mut self, model: ModelId, table: &T) -> Result<bool>
  where
    T: SpatialTable + ?Sized,
  {
    if model == self.model && !self.is_empty() {
      return Ok(false);
    }
    self.clear();
    self.model = model;
    if let Err(e) = bulk_load(self, table) {
      warn!(error = %e, "discarding partially loaded index");
      self.clear();
      return Err(e);
    }
    Ok(true)
  }
}

/// Export `index` to `table`, replacing the model's previous rows.
pub fn flush<T>(index: &OctreeIndex, table: &mut T) -> Result<usize>
where
  T: SpatialTable + ?Sized,
{
  let rows = index.to_rows()?;
  table.write_rows(index.model(), &rows)?;
  info!(model = %index.model(), rows = rows.len(), "flushed spatial index");
  Ok(rows.len())
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
