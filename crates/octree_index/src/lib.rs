//! octree_index - sparse linear-octree spatial index for building models
//!
//! This crate maps 3D building-model elements to the octree cells they
//! occupy, so that "what touches this region?" can be answered without
//! scanning every element.
//!
//! # Features
//!
//! - **Cell codec**: octant paths packed into a `u64` location code with a
//!   prefix-preserving string form for persisted range queries
//! - **Canonical index**: per-model `CellId -> CellData` map with lazy
//!   subdivision and a four-outcome `locate`
//! - **Scoped overlay**: transient per-query index built over the canonical
//!   index without mutating it
//! - **Bulk load / flush**: one-shot population from, and export to, a
//!   row-per-(element, cell) table
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use octree_index::{CellId, DAabb3, ElementKey, IndexConfig, Located, ModelId, OctreeIndex};
//!
//! let config = IndexConfig {
//!   max_depth: 3,
//!   world: DAabb3::new(DVec3::ZERO, DVec3::splat(8.0)),
//!   ..IndexConfig::default()
//! };
//! let mut index = OctreeIndex::new(ModelId::new(1), config).unwrap();
//!
//! let wall = ElementKey::new("wall-01", 0);
//! let cell: CellId = "R0".parse().unwrap();
//! index.insert_element(&wall, cell).unwrap();
//!
//! let below: CellId = "R03".parse().unwrap();
//! assert_eq!(index.locate(below), Located::FoundAncestor(cell));
//! ```

pub mod config;
pub mod coverage;
pub mod error;
pub mod interner;
pub mod loader;
pub mod model;
pub mod octree;
pub mod storage;

// Re-export commonly used items
pub use config::IndexConfig;
pub use coverage::{BoxCoverage, CellCoverage, CoveredCell};
pub use error::{IndexError, Result};
pub use interner::{ElementHandle, ElementInterner, ElementKey};
pub use loader::{bulk_load, flush, LoadStats};
pub use model::ModelId;
pub use octree::{
  CellData, CellId, CellKind, DAabb3, GridBounds, IndexStats, Located, OctreeIndex, OctreeSpace,
  OverlayRecord, Search, UserOverlay,
};
pub use storage::{
  locate_in_table, parent_cells, DescendantQuery, MemoryTable, SpatialRow, SpatialTable, TsvTable,
};
