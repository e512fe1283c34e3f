//! OctreeSpace - configured depth and world bounds, plus the coordinate math
//! that depends on them.

use glam::DVec3;

use super::{CellId, DAabb3, GridBounds, MAX_KEY_DEPTH};
use crate::error::{IndexError, Result};

/// Address space of one index: maximum depth and the world box the root
/// cell covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctreeSpace {
  max_depth: u8,
  world: DAabb3,
}

impl OctreeSpace {
  /// Create a space. `max_depth` must be in `1..=MAX_KEY_DEPTH` and the world
  /// box must have positive extent on every axis.
  pub fn new(max_depth: u8, world: DAabb3) -> Result<Self> {
    if max_depth == 0 || max_depth > MAX_KEY_DEPTH {
      return Err(IndexError::InvalidConfig(format!(
        "max_depth must be in 1..={MAX_KEY_DEPTH}, got {max_depth}"
      )));
    }
    let size = world.size();
    if !(size.x > 0.0 && size.y > 0.0 && size.z > 0.0) {
      return Err(IndexError::InvalidConfig(format!(
        "world bounds must have positive extent, got {:?}..{:?}",
        world.min, world.max
      )));
    }
    Ok(Self { max_depth, world })
  }

  /// Deepest level cells may be created at.
  #[inline]
  pub fn max_depth(&self) -> u8 {
    self.max_depth
  }

  /// The world bounding box.
  #[inline]
  pub fn world(&self) -> &DAabb3 {
    &self.world
  }

  /// Number of finest-level cells along each axis.
  #[inline]
  pub fn grid_resolution(&self) -> u32 {
    1u32 << self.max_depth
  }

  /// Fail with `DepthExceeded` if `cell` is deeper than the max depth.
  pub fn check_depth(&self, cell: CellId) -> Result<()> {
    if cell.level() > self.max_depth {
      return Err(IndexError::DepthExceeded {
        level: cell.level() as i32,
        max_depth: self.max_depth,
      });
    }
    Ok(())
  }

  /// Child of `cell` selecting `octant`, bounded by the configured depth.
  pub fn child(&self, cell: CellId, octant: u8) -> Result<CellId> {
    let level = cell.level() + 1;
    if level > self.max_depth {
      return Err(IndexError::DepthExceeded {
        level: level as i32,
        max_depth: self.max_depth,
      });
    }
    cell.canonical().child(octant)
  }

  /// All 8 children of `cell`, bounded by the configured depth.
  pub fn children(&self, cell: CellId) -> Result<[CellId; 8]> {
    let mut out = [CellId::ROOT; 8];
    for (octant, slot) in out.iter_mut().enumerate() {
      *slot = self.child(cell, octant as u8)?;
    }
    Ok(out)
  }

  /// Parent of `cell`; fails at the root.
  pub fn parent(&self, cell: CellId) -> Result<CellId> {
    cell.parent()
  }

  /// World-space size of a cell at `level`.
  #[inline]
  pub fn cell_size(&self, level: u8) -> DVec3 {
    self.world.size() / (1u64 << level) as f64
  }

  /// Deepest-level cell containing `point`.
  ///
  /// Each axis is subdivided `max_depth` times independently. Points on the
  /// world's max face belong to the last cell on that axis.
  pub fn at_max_depth(&self, point: DVec3) -> Result<CellId> {
    if !self.world.contains_point(point) {
      return Err(IndexError::OutsideWorld { point });
    }
    let resolution = self.grid_resolution();
    let rel = (point - self.world.min) / self.world.size() * resolution as f64;
    let clamp = |t: f64| (t.floor() as u32).min(resolution - 1);
    CellId::from_grid(clamp(rel.x), clamp(rel.y), clamp(rel.z), self.max_depth)
  }

  /// Integer grid bounds of `cell` in finest-level units.
  pub fn decode_bounds(&self, cell: CellId) -> Result<GridBounds> {
    self.check_depth(cell)?;
    let scale = 1u32 << (self.max_depth - cell.level());
    let (x, y, z) = cell.grid_coords();
    let min = [x * scale, y * scale, z * scale];
    Ok(GridBounds {
      min,
      max: [min[0] + scale, min[1] + scale, min[2] + scale],
    })
  }

  /// World-space bounding box of `cell`.
  pub fn world_bounds(&self, cell: CellId) -> DAabb3 {
    let size = self.cell_size(cell.level());
    let (x, y, z) = cell.grid_coords();
    let min = self.world.min + DVec3::new(x as f64, y as f64, z as f64) * size;
    DAabb3::new(min, min + size)
  }

  /// Smallest cell (not deeper than max depth) that contains all of `aabb`.
  pub fn smallest_containing_cell(&self, aabb: &DAabb3) -> Result<CellId> {
    let low = self.at_max_depth(aabb.min)?;
    let high = self.at_max_depth(aabb.max)?;
    Ok(low.common_ancestor(&high))
  }
}

#[cfg(test)]
#[path = "space_test.rs"]
mod space_test;
