//! In-memory spatial table, for tests and for staging a flush.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use super::{DescendantQuery, SpatialRow, SpatialTable};
use crate::error::Result;
use crate::model::ModelId;

/// Rows of each model, grouped by cell string.
#[derive(Clone, Debug, Default)]
pub struct MemoryTable {
  models: HashMap<ModelId, BTreeMap<String, BTreeSet<String>>>,
}

impl MemoryTable {
  /// Create an empty table.
  pub fn new() -> Self {
    Self::default()
  }

  /// Add one row for `model`.
  pub fn insert(&mut self, model: ModelId, element: impl Into<String>, cell: impl Into<String>) {
    self
      .models
      .entry(model)
      .or_default()
      .entry(cell.into())
      .or_default()
      .insert(element.into());
  }

  /// Number of rows stored for `model`.
  pub fn row_count(&self, model: ModelId) -> usize {
    self
      .models
      .get(&model)
      .map_or(0, |cells| cells.values().map(BTreeSet::len).sum())
  }
}

impl SpatialTable for MemoryTable {
  fn rows(&self, model: ModelId) -> Result<Vec<SpatialRow>> {
    let Some(cells) = self.models.get(&model) else {
      return Ok(Vec::new());
    };
    Ok(
      cells
        .iter()
        .flat_map(|(cell, elements)| {
          elements.iter().map(move |element| SpatialRow {
            cell: cell.clone(),
            element: element.clone(),
          })
        })
        .collect(),
    )
  }

  fn has_cell(&self, model: ModelId, cell: &str) -> Result<bool> {
    Ok(
      self
        .models
        .get(&model)
        .is_some_and(|cells| cells.contains_key(cell)),
    )
  }

  fn cells_after_prefix(&self, model: ModelId, prefix: &str) -> Result<Vec<String>> {
    let Some(cells) = self.models.get(&model) else {
      return Ok(Vec::new());
    };
    let query = DescendantQuery {
      prefix: prefix.to_owned(),
    };
    Ok(
      cells
        .range::<str, _>((Bound::Excluded(prefix), Bound::Unbounded))
        .map(|(cell, _)| cell)
        .take_while(|cell| cell.starts_with(prefix))
        .filter(|cell| query.matches(cell))
        .cloned()
        .collect(),
    )
  }

  fn write_rows(&mut self, model: ModelId, rows: &[SpatialRow]) -> Result<()> {
    let mut cells: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
      cells
        .entry(row.cell.clone())
        .or_default()
        .insert(row.element.clone());
    }
    self.models.insert(model, cells);
    Ok(())
  }
}
