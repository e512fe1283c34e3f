//! Octree module: cell addressing, the canonical index and scoped overlays.
//!
//! The tree is stored linearly: every materialized cell is one entry of a
//! `CellId -> CellData` map, and parent/child relationships are computed
//! from the location code instead of being stored.
//!
//! # Level Convention
//!
//! Level 0 = root (the whole world box), higher level = finer.
//!
//! ```text
//! Cell Size = world_extent / 2^level
//! ```
//!
//! # Module Structure
//!
//! - [`cell`]: `CellId` - packed octant path with a prefix-preserving string form
//! - [`space`]: `OctreeSpace` - max depth, world bounds and coordinate math
//! - [`bounds`]: `DAabb3` and `GridBounds`
//! - [`data`]: `CellData` / `CellKind` - per-cell contents
//! - [`locate`]: `Located` / `Search` - lookup outcomes
//! - [`index`]: `OctreeIndex` - canonical per-model index
//! - [`overlay`]: `UserOverlay` - transient per-query index

pub mod bounds;
pub mod cell;
pub mod data;
pub mod index;
pub mod locate;
pub mod overlay;
pub mod space;

// Re-exports
pub use bounds::{DAabb3, GridBounds};
pub use cell::{CellId, MAX_KEY_DEPTH};
pub use data::{CellData, CellKind};
pub use index::{IndexStats, OctreeIndex};
pub use locate::{Located, Search};
pub use overlay::{OverlayRecord, UserOverlay};
pub use space::OctreeSpace;
