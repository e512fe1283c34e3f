use std::collections::BTreeSet;

use glam::DVec3;

use super::*;
use crate::interner::ElementHandle;
use crate::octree::{DAabb3, Located};
use crate::storage::{MemoryTable, SpatialRow, TsvTable};

const MODEL: ModelId = ModelId::new(12);

fn config() -> IndexConfig {
  IndexConfig {
    max_depth: 3,
    world: DAabb3::new(DVec3::ZERO, DVec3::splat(8.0)),
    ..IndexConfig::default()
  }
}

fn cell(s: &str) -> CellId {
  s.parse().unwrap()
}

fn table(model: ModelId, rows: &[(&str, &str)]) -> MemoryTable {
  let mut table = MemoryTable::new();
  for (element, cell) in rows {
    table.insert(model, *element, *cell);
  }
  table
}

// =========================================================================
// bulk_load
// =========================================================================

/// One leaf per distinct cell, one handle per distinct element.
#[test]
fn test_bulk_load_groups_rows() {
  let table = table(
    MODEL,
    &[
      ("wall", "R01"),
      ("wall", "R02"),
      ("slab", "R01B"),
      ("door#1", "R345"),
    ],
  );
  let mut index = OctreeIndex::new(MODEL, config()).unwrap();
  let stats = bulk_load(&mut index, &table).unwrap();
  assert_eq!(
    stats,
    LoadStats {
      rows: 4,
      cells: 3,
      elements: 3
    }
  );

  let slab = index.interner().get(&ElementKey::new("slab", 0)).unwrap();
  let wall = index.interner().get(&ElementKey::new("wall", 0)).unwrap();
  assert_eq!(
    index.get(cell("R01")),
    Some(&CellData::Leaf(BTreeSet::from([slab, wall])))
  );
  assert!(index.interner().get(&ElementKey::new("door", 1)).is_some());
  // Leaves only: no ancestors were materialized.
  assert_eq!(index.get(cell("R0")), None);
  assert_eq!(index.len(), 4);
}

/// A loaded index answers descendant lookups from its bare leaves.
#[test]
fn test_loaded_index_locate() {
  let table = table(MODEL, &[("wall", "R01"), ("door", "R345")]);
  let index = OctreeIndex::load(MODEL, config(), &table).unwrap();

  assert_eq!(
    index.locate(cell("R0")),
    Located::FoundDescendant(smallvec::smallvec![cell("R01")])
  );
  assert_eq!(index.locate(cell("R3457")), Located::NotFound);
  assert_eq!(
    index.locate(cell("R34")),
    Located::FoundDescendant(smallvec::smallvec![cell("R345")])
  );
  assert_eq!(index.locate(cell("R017")), Located::FoundAncestor(cell("R01")));
}

/// Inserting into a loaded index subdivides around existing leaves.
#[test]
fn test_insert_after_load() {
  let table = table(MODEL, &[("wall", "R01")]);
  let mut index = OctreeIndex::load(MODEL, config(), &table).unwrap();
  let wall = index.interner().get(&ElementKey::new("wall", 0)).unwrap();

  let beam = index
    .insert_element(&ElementKey::new("beam", 0), cell("R05"))
    .unwrap();
  assert_eq!(index.get(cell("R0")), Some(&CellData::Node));
  assert_eq!(
    index.get(cell("R01")),
    Some(&CellData::Leaf(BTreeSet::from([wall])))
  );
  assert_eq!(
    index.get(cell("R05")),
    Some(&CellData::Leaf(BTreeSet::from([beam])))
  );
}

/// Inserting at an ancestor of a loaded leaf reaches that leaf too.
#[test]
fn test_insert_above_loaded_leaf() {
  let table = table(MODEL, &[("wall", "R01")]);
  let mut index = OctreeIndex::load(MODEL, config(), &table).unwrap();
  let wall = index.interner().get(&ElementKey::new("wall", 0)).unwrap();

  let slab = index
    .insert_element(&ElementKey::new("slab", 0), cell("R0"))
    .unwrap();
  assert_eq!(index.get(cell("R0")), Some(&CellData::Node));
  assert_eq!(
    index.get(cell("R01")),
    Some(&CellData::Leaf(BTreeSet::from([wall, slab])))
  );
  assert_eq!(index.elements_touching(cell("R01")), BTreeSet::from([wall, slab]));
  assert_eq!(index.elements_touching(cell("R013")), BTreeSet::from([wall, slab]));
  assert_eq!(index.elements_touching(cell("R02")), BTreeSet::from([slab]));
}

/// Bad rows fail the load with the row number in the context.
#[test]
fn test_bulk_load_rejects_bad_rows() {
  for (rows, needle) in [
    (vec![("wall", "R01"), ("wall", "R01x")], "row 2"),
    (vec![("wall", "R0123")], "row 1"),
    (vec![("bad key", "R01")], "row 1"),
  ] {
    let table = table(MODEL, &rows);
    let mut index = OctreeIndex::new(MODEL, config()).unwrap();
    let err = bulk_load(&mut index, &table).unwrap_err();
    assert!(
      matches!(err, IndexError::StorageLoadFailure { model, .. } if model == MODEL),
      "{rows:?}: {err}"
    );
    assert!(err.to_string().contains(needle), "{err}");
  }
}

// =========================================================================
// activate
// =========================================================================

/// Switching models rebuilds; re-activating a loaded model does not.
#[test]
fn test_activate() {
  let other = ModelId::new(13);
  let mut table = table(MODEL, &[("wall", "R01")]);
  table.insert(other, "roof", "R7");

  let mut index = OctreeIndex::new(MODEL, config()).unwrap();
  assert!(index.activate(MODEL, &table).unwrap());
  assert!(!index.activate(MODEL, &table).unwrap());

  assert!(index.activate(other, &table).unwrap());
  assert_eq!(index.model(), other);
  assert_eq!(index.get(cell("R01")), None);
  assert_eq!(index.element_key(ElementHandle::new(0)).unwrap().id, "roof");
}

/// A failed rebuild leaves an empty index behind.
#[test]
fn test_activate_failure_clears() {
  let other = ModelId::new(13);
  let mut table = table(MODEL, &[("wall", "R01")]);
  table.insert(other, "roof", "nonsense");

  let mut index = OctreeIndex::load(MODEL, config(), &table).unwrap();
  assert!(index.activate(other, &table).is_err());
  assert!(index.is_empty());
}

// =========================================================================
// flush
// =========================================================================

/// Flushed rows reload into an index exporting the same rows.
#[test]
fn test_flush_round_trip() {
  let mut index = OctreeIndex::new(MODEL, config()).unwrap();
  index.insert_element(&ElementKey::new("wall", 0), cell("R0")).unwrap();
  index.insert_element(&ElementKey::new("beam", 2), cell("R013")).unwrap();

  let mut table = MemoryTable::new();
  let written = flush(&index, &mut table).unwrap();
  assert_eq!(written, table.row_count(MODEL));

  let reloaded = OctreeIndex::load(MODEL, config(), &table).unwrap();
  let rows: Vec<SpatialRow> = reloaded.to_rows().unwrap();
  assert_eq!(rows, index.to_rows().unwrap());
  assert_eq!(reloaded.elements_touching(cell("R013")).len(), 2);
}

/// Ids with separators, spaces or tabs keep their identity through a
/// persisted table.
#[test]
fn test_flush_round_trip_preserves_awkward_ids() {
  let keys = [
    ElementKey::new("a#1", 0),
    ElementKey::new("a", 1),
    ElementKey::new("has space", 0),
    ElementKey::new("tab\tid", 0),
  ];
  let mut index = OctreeIndex::new(MODEL, config()).unwrap();
  for key in &keys {
    index.insert_element(key, cell("R25")).unwrap();
  }

  let dir = tempfile::tempdir().unwrap();
  let mut table = TsvTable::new(dir.path());
  assert_eq!(flush(&index, &mut table).unwrap(), keys.len());

  let reloaded = OctreeIndex::load(MODEL, config(), &table).unwrap();
  assert_eq!(reloaded.interner().len(), keys.len());
  let touching = reloaded.elements_touching(cell("R25"));
  assert_eq!(touching.len(), keys.len());
  for key in &keys {
    let handle = reloaded.interner().get(key).unwrap();
    assert!(touching.contains(&handle), "{key:?}");
  }
}
