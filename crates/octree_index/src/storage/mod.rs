//! Persisted spatial-index rows and the cold-path lookup against them.
//!
//! A spatial-index table holds one row per (element, cell) membership,
//! with the cell in its string form. Because every ancestor's string is a
//! prefix of its descendants' strings, "everything below this cell" is a
//! prefix range scan in any store that orders strings lexicographically.

mod memory;
mod tsv;

use std::collections::BTreeMap;
use std::fmt::Debug;

pub use memory::MemoryTable;
pub use tsv::TsvTable;

use crate::error::{IndexError, Result};
use crate::interner::ElementKey;
use crate::model::ModelId;
use crate::octree::{CellId, Located};

// ============================================================================
// Rows
// ============================================================================

/// One persisted (element, cell) membership.
///
/// Ordered by cell string, then element string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SpatialRow {
  /// Cell string form (may carry the border marker).
  pub cell: String,
  /// Element key string form.
  pub element: String,
}

impl SpatialRow {
  /// Row for `element` at `cell`.
  pub fn new(element: &ElementKey, cell: CellId) -> Self {
    Self {
      cell: cell.to_string(),
      element: element.to_string(),
    }
  }

  /// Parse the cell column.
  pub fn parse_cell(&self) -> Result<CellId> {
    self.cell.parse()
  }

  /// Parse the element column.
  pub fn parse_element(&self) -> Result<ElementKey> {
    self.element.parse()
  }
}

// ============================================================================
// Table trait
// ============================================================================

/// Backing store of spatial-index rows, partitioned by model.
pub trait SpatialTable: Debug {
  /// Every row of `model`, in storage order.
  fn rows(&self, model: ModelId) -> Result<Vec<SpatialRow>>;

  /// Whether any row of `model` has exactly this cell string.
  fn has_cell(&self, model: ModelId, cell: &str) -> Result<bool>;

  /// Distinct cell strings of `model` strictly below `prefix`.
  ///
  /// Equivalent to [`DescendantQuery`]: cells starting with `prefix` that
  /// sort after it, excluding the border variant of the prefix cell itself.
  fn cells_after_prefix(&self, model: ModelId, prefix: &str) -> Result<Vec<String>>;

  /// Replace all rows of `model` with `rows`.
  fn write_rows(&mut self, model: ModelId, rows: &[SpatialRow]) -> Result<()>;
}

// ============================================================================
// Predicates
// ============================================================================

/// String forms of every non-root ancestor of `cell`, nearest first, each
/// followed by its border variant.
pub fn parent_cells(cell: CellId) -> Vec<String> {
  let mut out = Vec::new();
  let mut cursor = cell.canonical();
  while let Ok(parent) = cursor.parent() {
    if parent.is_root() {
      break;
    }
    out.push(parent.to_string());
    out.push(parent.border_variant().to_string());
    cursor = parent;
  }
  out
}

/// Prefix predicate selecting the cells strictly below one cell.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DescendantQuery {
  /// Canonical string of the ancestor cell.
  pub prefix: String,
}

impl DescendantQuery {
  /// Query for the descendants of `cell`.
  pub fn new(cell: CellId) -> Self {
    Self {
      prefix: cell.canonical().to_string(),
    }
  }

  /// Whether `cell` (string form) lies strictly below the prefix cell.
  pub fn matches(&self, cell: &str) -> bool {
    cell.len() > self.prefix.len()
      && cell.starts_with(&self.prefix)
      && &cell[self.prefix.len()..] != "B"
  }

  /// SQL predicate over a cell-string `column`.
  pub fn to_sql(&self, column: &str) -> String {
    let prefix = &self.prefix;
    format!("{column} LIKE '{prefix}%' AND {column} > '{prefix}' AND {column} <> '{prefix}B'")
  }
}

// ============================================================================
// Cold-path lookup
// ============================================================================

/// Locate `cell` directly against a table, without an in-memory index.
///
/// Same outcomes as [`OctreeIndex::locate`](crate::OctreeIndex::locate):
/// exact (the cell or its border variant), then the nearest non-root
/// ancestor (or its border variant), then, above `max_depth`, every stored
/// descendant. Located ids are canonical.
pub fn locate_in_table<T>(table: &T, model: ModelId, cell: CellId, max_depth: u8) -> Result<Located>
where
  T: SpatialTable + ?Sized,
{
  let cell = cell.canonical();
  if cell.level() > max_depth {
    return Ok(Located::NotFound);
  }
  if has_either(table, model, cell)? {
    return Ok(Located::NodeFound(cell));
  }

  let mut cursor = cell;
  while let Ok(parent) = cursor.parent() {
    if parent.is_root() {
      break;
    }
    if has_either(table, model, parent)? {
      return Ok(Located::FoundAncestor(parent));
    }
    cursor = parent;
  }

  if cell.level() >= max_depth {
    return Ok(Located::NotFound);
  }
  // Keyed by string so hits come back in storage (pre-order) order.
  let mut found = BTreeMap::new();
  for text in table.cells_after_prefix(model, &cell.to_string())? {
    let id: CellId = text.parse().map_err(|e: IndexError| {
      IndexError::storage(model, format!("descendant of {cell}: {e}"))
    })?;
    let id = id.canonical();
    if id.level() <= max_depth {
      found.insert(id.to_string(), id);
    }
  }
  if found.is_empty() {
    return Ok(Located::NotFound);
  }
  Ok(Located::FoundDescendant(found.into_values().collect()))
}

fn has_either<T>(table: &T, model: ModelId, cell: CellId) -> Result<bool>
where
  T: SpatialTable + ?Sized,
{
  Ok(table.has_cell(model, &cell.to_string())?
    || table.has_cell(model, &cell.border_variant().to_string())?)
}
