use std::collections::BTreeSet;

use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::error::IndexError;
use crate::octree::{DAabb3, MAX_KEY_DEPTH};

fn index(max_depth: u8) -> OctreeIndex {
  let config = IndexConfig {
    max_depth,
    world: DAabb3::new(DVec3::ZERO, DVec3::splat(8.0)),
    ..IndexConfig::default()
  };
  OctreeIndex::new(ModelId::new(1), config).unwrap()
}

fn cell(s: &str) -> CellId {
  s.parse().unwrap()
}

fn handles(ids: &[u32]) -> BTreeSet<ElementHandle> {
  ids.iter().map(|&i| ElementHandle::new(i)).collect()
}

fn leaf(ids: &[u32]) -> CellData {
  CellData::Leaf(handles(ids))
}

// =========================================================================
// Construction
// =========================================================================

/// A new index holds only an empty root leaf.
#[test]
fn test_new_index_has_root_only() {
  let idx = index(3);
  assert!(idx.is_empty());
  assert_eq!(idx.len(), 1);
  assert_eq!(idx.get(CellId::ROOT), Some(&CellData::empty_leaf()));
  assert_eq!(idx.model(), ModelId::new(1));
}

/// clear drops everything but the root and resets the interner.
#[test]
fn test_clear() {
  let mut idx = index(3);
  idx
    .insert_element(&ElementKey::new("a", 0), cell("R12"))
    .unwrap();
  idx.clear();
  assert!(idx.is_empty());
  assert!(idx.interner().is_empty());
}

// =========================================================================
// Insertion
// =========================================================================

/// Scenario A: E1 at R0, then E2 at R00 (max depth 3, world 8^3).
#[test]
fn test_scenario_a() {
  let mut idx = index(3);
  let e1 = idx.insert_element(&ElementKey::new("E1", 0), cell("R0")).unwrap();
  let e2 = idx.insert_element(&ElementKey::new("E2", 0), cell("R00")).unwrap();

  // R00 exists and holds E2 (plus E1 inherited from R0).
  assert_eq!(idx.locate(cell("R00")), Located::NodeFound(cell("R00")));
  let at_r00 = idx.get(cell("R00")).and_then(CellData::handles).unwrap();
  assert!(at_r00.contains(&e2));
  assert!(at_r00.contains(&e1));

  // R0 was subdivided; its sibling children inherited E1.
  assert_eq!(idx.get(cell("R0")), Some(&CellData::Node));
  assert_eq!(idx.locate(cell("R01")), Located::NodeFound(cell("R01")));
  assert_eq!(idx.get(cell("R01")), Some(&CellData::Leaf(BTreeSet::from([e1]))));

  // One level further down, R01 is the resolving ancestor holding E1.
  assert_eq!(idx.locate(cell("R013")), Located::FoundAncestor(cell("R01")));
  assert_eq!(idx.elements_touching(cell("R013")), BTreeSet::from([e1]));
}

/// Inserting the same membership twice equals inserting it once.
#[test]
fn test_insert_is_idempotent() {
  let mut once = index(3);
  let mut twice = index(3);
  let h = ElementHandle::new(0);

  once.insert(h, cell("R25")).unwrap();
  twice.insert(h, cell("R25")).unwrap();
  twice.insert(h, cell("R25")).unwrap();

  assert_eq!(once.get(cell("R25")), twice.get(cell("R25")));
  assert_eq!(once.stats(), twice.stats());
}

/// Subdividing a populated leaf copies its handles to all 8 children.
#[test]
fn test_subdivision_copies_handles() {
  let mut idx = index(3);
  idx.insert(ElementHandle::new(0), cell("R4")).unwrap();
  idx.insert(ElementHandle::new(1), cell("R4")).unwrap();
  idx.insert(ElementHandle::new(2), cell("R45")).unwrap();

  assert_eq!(idx.get(cell("R4")), Some(&CellData::Node));
  for octant in 0..8u8 {
    let child = cell("R4").child(octant).unwrap();
    let data = idx.get(child).and_then(CellData::handles).unwrap();
    assert!(data.contains(&ElementHandle::new(0)), "R4{octant} keeps 0");
    assert!(data.contains(&ElementHandle::new(1)), "R4{octant} keeps 1");
    assert_eq!(data.contains(&ElementHandle::new(2)), octant == 5);
  }
}

/// A root leaf holding data spreads it to every child when subdivided.
#[test]
fn test_root_subdivision() {
  let mut idx = index(2);
  idx.insert(ElementHandle::new(0), CellId::ROOT).unwrap();
  assert_eq!(idx.get(CellId::ROOT), Some(&leaf(&[0])));

  idx.insert(ElementHandle::new(1), cell("R36")).unwrap();
  assert_eq!(idx.get(CellId::ROOT), Some(&CellData::Node));
  assert_eq!(idx.get(cell("R7")), Some(&leaf(&[0])));
  assert_eq!(idx.get(cell("R3")), Some(&CellData::Node));
  assert_eq!(idx.get(cell("R36")), Some(&leaf(&[0, 1])));
  assert_eq!(idx.get(cell("R30")), Some(&leaf(&[0])));
  // root + 8 + 8
  assert_eq!(idx.len(), 17);
}

/// Inserting at an already-subdivided cell fills every child.
#[test]
fn test_insert_at_node_recurses() {
  let mut idx = index(3);
  idx.insert(ElementHandle::new(0), cell("R000")).unwrap();
  assert_eq!(idx.get(cell("R00")), Some(&CellData::Node));

  idx.insert(ElementHandle::new(1), cell("R0")).unwrap();
  assert_eq!(idx.get(cell("R0")), Some(&CellData::Node));
  for octant in 0..8u8 {
    let child = cell("R00").child(octant).unwrap();
    let data = idx.get(child).and_then(CellData::handles).unwrap();
    assert!(data.contains(&ElementHandle::new(1)), "R00{octant}");
  }
  assert_eq!(idx.get(cell("R07")), Some(&leaf(&[1])));
}

/// Inserting above existing finer entries reaches them instead of shadowing
/// them with a leaf.
#[test]
fn test_insert_above_existing_entries() {
  let mut idx = index(3);
  idx.cells.insert(cell("R01"), leaf(&[0]));

  idx.insert(ElementHandle::new(1), cell("R0")).unwrap();
  assert_eq!(idx.get(cell("R0")), Some(&CellData::Node));
  assert_eq!(idx.get(cell("R01")), Some(&leaf(&[0, 1])));
  assert_eq!(idx.get(cell("R06")), Some(&leaf(&[1])));
  assert_eq!(idx.elements_touching(cell("R01")), handles(&[0, 1]));
}

/// A populated leaf with finer entries below it passes its handles down to
/// them when it is subdivided.
#[test]
fn test_subdivision_reaches_existing_entries() {
  let mut idx = index(3);
  idx.cells.insert(cell("R0"), leaf(&[0]));
  idx.cells.insert(cell("R012"), leaf(&[1]));

  idx.insert(ElementHandle::new(2), cell("R05")).unwrap();
  assert_eq!(idx.get(cell("R0")), Some(&CellData::Node));
  assert_eq!(idx.get(cell("R01")), Some(&CellData::Node));
  assert_eq!(idx.get(cell("R012")), Some(&leaf(&[0, 1])));
  assert_eq!(idx.get(cell("R017")), Some(&leaf(&[0])));
  assert_eq!(idx.get(cell("R05")), Some(&leaf(&[0, 2])));
  assert_eq!(idx.get(cell("R03")), Some(&leaf(&[0])));
  // Every leaf below R0 still sees element 0.
  assert!(idx
    .cells()
    .filter(|(id, data)| cell("R0").is_ancestor_of(id) && data.is_leaf())
    .all(|(_, data)| data.handles().is_some_and(|h| h.contains(&ElementHandle::new(0)))));
}

/// Cells beyond the configured depth are rejected without side effects.
#[test]
fn test_insert_beyond_max_depth() {
  let mut idx = index(2);
  let err = idx.insert(ElementHandle::new(0), cell("R000")).unwrap_err();
  assert!(matches!(
    err,
    IndexError::DepthExceeded {
      level: 3,
      max_depth: 2
    }
  ));
  assert!(err.is_misuse());
  assert!(idx.is_empty());
}

/// Border variants are indexed under the canonical cell.
#[test]
fn test_insert_border_variant_uses_canonical_cell() {
  let mut idx = index(3);
  idx
    .insert(ElementHandle::new(0), cell("R12").border_variant())
    .unwrap();
  assert_eq!(idx.get(cell("R12")), Some(&leaf(&[0])));
  assert_eq!(idx.locate(cell("R12B")), Located::NodeFound(cell("R12")));
}

// =========================================================================
// Locate
// =========================================================================

/// Exact, ancestor, descendant and not-found outcomes over loaded leaves.
#[test]
fn test_locate_outcomes() {
  let mut idx = index(4);
  idx.cells.insert(cell("R123"), leaf(&[0]));
  idx.cells.insert(cell("R5"), leaf(&[1]));

  assert_eq!(idx.locate(cell("R123")), Located::NodeFound(cell("R123")));
  assert_eq!(idx.locate(cell("R5671")), Located::FoundAncestor(cell("R5")));
  assert_eq!(
    idx.locate(cell("R1")),
    Located::FoundDescendant(SmallVec::from_slice(&[cell("R123")]))
  );
  assert_eq!(idx.locate(cell("R2")), Located::NotFound);
  // Max-depth cells have no descendants to search.
  assert_eq!(idx.locate(cell("R2222")), Located::NotFound);
  // Deeper than max depth is never found.
  assert_eq!(idx.locate(cell("R12300")), Located::NotFound);
}

/// The root is an exact hit but never an ancestor hit.
#[test]
fn test_root_is_not_an_ancestor() {
  let idx = index(3);
  assert_eq!(idx.locate(CellId::ROOT), Located::NodeFound(CellId::ROOT));
  assert_eq!(idx.locate(cell("R7")), Located::NotFound);
}

/// Ancestor matches win over descendant matches.
#[test]
fn test_ancestor_priority() {
  let mut idx = index(4);
  idx.cells.insert(cell("R1"), leaf(&[0]));
  idx.cells.insert(cell("R123"), leaf(&[1]));

  assert_eq!(idx.locate(cell("R12")), Located::FoundAncestor(cell("R1")));
  assert_eq!(
    idx.locate_with(cell("R12"), Search { ancestors: false, descendants: true }),
    Located::FoundDescendant(SmallVec::from_slice(&[cell("R123")]))
  );
  assert_eq!(idx.locate_with(cell("R12"), Search::EXACT), Located::NotFound);
}

/// A descendant node is reported without expanding beneath it.
#[test]
fn test_descendant_node_not_expanded() {
  let mut idx = index(4);
  idx.cells.insert(cell("R12"), CellData::Node);
  idx.cells.insert(cell("R120"), leaf(&[0]));
  idx.cells.insert(cell("R1711"), leaf(&[1]));

  let Located::FoundDescendant(ids) = idx.locate(cell("R1")) else {
    panic!("expected descendants");
  };
  assert_eq!(ids.as_slice(), &[cell("R12"), cell("R1711")]);
}

/// Descendant search cost follows the entries present, not the depth left
/// below the queried cell.
#[test]
fn test_descendant_search_at_key_depth() {
  let mut idx = index(MAX_KEY_DEPTH);
  let deep = format!("R2{}", "0".repeat(MAX_KEY_DEPTH as usize - 1));
  idx.cells.insert(cell(&deep), leaf(&[0]));
  idx.cells.insert(cell("R27"), CellData::Node);
  idx.cells.insert(cell("R270"), leaf(&[1]));
  idx.cells.insert(cell("R3"), leaf(&[2]));

  assert_eq!(
    idx.locate(cell("R2")),
    Located::FoundDescendant(SmallVec::from_slice(&[cell(&deep), cell("R27")]))
  );
  assert_eq!(idx.locate(cell("R1")), Located::NotFound);
  assert_eq!(idx.locate(cell("R4")), Located::NotFound);
}

/// For random index states every outcome is consistent with the cell map.
#[test]
fn test_locate_totality_random() {
  let max_depth = 4;
  let mut rng = StdRng::seed_from_u64(0x5eed);
  let random_cell = |rng: &mut StdRng| {
    let level = rng.random_range(1..=max_depth);
    let path: Vec<u8> = (0..level).map(|_| rng.random_range(0..8u8)).collect();
    CellId::from_path(&path).unwrap()
  };

  for round in 0..20 {
    let mut idx = index(max_depth);
    for i in 0..rng.random_range(1..6u32) {
      let c = random_cell(&mut rng);
      if round % 2 == 0 {
        idx.insert(ElementHandle::new(i), c).unwrap();
      } else {
        idx.cells.insert(c, leaf(&[i]));
      }
    }

    for _ in 0..50 {
      let probe = random_cell(&mut rng);
      let has_ancestor = idx
        .cells
        .keys()
        .any(|k| !k.is_root() && k.is_ancestor_of(&probe));
      let has_descendant = idx.cells.keys().any(|k| probe.is_ancestor_of(k));

      match idx.locate(probe) {
        Located::NodeFound(id) => {
          assert_eq!(id, probe);
          assert!(idx.cells.contains_key(&probe));
        }
        Located::FoundAncestor(id) => {
          assert!(!idx.cells.contains_key(&probe));
          assert!(id.is_ancestor_of(&probe) && idx.cells.contains_key(&id));
        }
        Located::FoundDescendant(ids) => {
          assert!(!has_ancestor && !idx.cells.contains_key(&probe));
          assert!(ids
            .iter()
            .all(|id| probe.is_ancestor_of(id) && idx.cells.contains_key(id)));
        }
        Located::NotFound => {
          assert!(!idx.cells.contains_key(&probe));
          assert!(!has_ancestor, "missed ancestor of {probe}");
          assert!(!has_descendant, "missed descendant of {probe}");
        }
      }
    }
  }
}

// =========================================================================
// Queries and export
// =========================================================================

/// elements_touching resolves every outcome into handles.
#[test]
fn test_elements_touching() {
  let mut idx = index(3);
  idx.insert(ElementHandle::new(0), cell("R10")).unwrap();
  idx.insert(ElementHandle::new(1), cell("R17")).unwrap();
  idx.insert(ElementHandle::new(2), cell("R6")).unwrap();

  // Node R1: union of the leaves below it.
  assert_eq!(idx.elements_touching(cell("R1")), handles(&[0, 1]));
  // Ancestor R6.
  assert_eq!(idx.elements_touching(cell("R666")), handles(&[2]));
  // Unrelated empty leaf.
  assert!(idx.elements_touching(cell("R2")).is_empty());
}

/// Rows are one per membership, sorted by cell then element.
#[test]
fn test_to_rows() {
  let mut idx = index(2);
  let a = ElementKey::new("a", 0);
  let b = ElementKey::new("b", 1);
  idx.insert_element(&b, cell("R3")).unwrap();
  idx.insert_element(&a, cell("R3")).unwrap();
  idx.insert_element(&a, cell("R12")).unwrap();

  let rows = idx.to_rows().unwrap();
  let pairs: Vec<(String, String)> = rows
    .into_iter()
    .map(|r| (r.cell, r.element))
    .collect();
  assert_eq!(
    pairs,
    vec![
      ("R12".to_owned(), "a".to_owned()),
      ("R3".to_owned(), "a".to_owned()),
      ("R3".to_owned(), "b#1".to_owned()),
    ]
  );
}

/// Stats count cells by kind and memberships.
#[test]
fn test_stats() {
  let mut idx = index(2);
  idx.insert(ElementHandle::new(0), cell("R12")).unwrap();
  let stats = idx.stats();
  assert_eq!(stats.cells, 17);
  assert_eq!(stats.nodes, 2);
  assert_eq!(stats.leaves, 15);
  assert_eq!(stats.memberships, 1);
  assert_eq!(idx.leaf_count(), stats.leaves);
  assert_eq!(idx.node_count(), stats.nodes);
}
