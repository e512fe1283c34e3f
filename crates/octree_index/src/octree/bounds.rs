//! Bounding boxes: world-space (double precision) and integer grid-space.

use glam::DVec3;
use serde::Deserialize;

/// Double-precision axis-aligned bounding box.
///
/// Used for the world bounding box that the root cell covers, and for the
/// world-space extent of individual cells.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct DAabb3 {
  /// Minimum corner (inclusive).
  pub min: DVec3,
  /// Maximum corner (inclusive).
  pub max: DVec3,
}

impl DAabb3 {
  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: DVec3, max: DVec3) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y && min.z <= max.z,
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  /// Check if this AABB overlaps with another.
  ///
  /// Two AABBs overlap if they share any interior or boundary points.
  #[inline]
  pub fn overlaps(&self, other: &DAabb3) -> bool {
    self.min.x <= other.max.x
      && self.max.x >= other.min.x
      && self.min.y <= other.max.y
      && self.max.y >= other.min.y
      && self.min.z <= other.max.z
      && self.max.z >= other.min.z
  }

  /// Check if this AABB contains a point.
  #[inline]
  pub fn contains_point(&self, point: DVec3) -> bool {
    point.x >= self.min.x
      && point.x <= self.max.x
      && point.y >= self.min.y
      && point.y <= self.max.y
      && point.z >= self.min.z
      && point.z <= self.max.z
  }

  /// Check if `other` lies entirely inside this AABB.
  #[inline]
  pub fn contains_aabb(&self, other: &DAabb3) -> bool {
    self.contains_point(other.min) && self.contains_point(other.max)
  }

  /// The overlapping part of two AABBs, `None` if they are disjoint.
  pub fn intersection(&self, other: &DAabb3) -> Option<DAabb3> {
    if !self.overlaps(other) {
      return None;
    }
    Some(Self {
      min: self.min.max(other.min),
      max: self.max.min(other.max),
    })
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> DVec3 {
    self.max - self.min
  }
}

/// Integer grid bounds of a cell, half-open: `[min, max)` per axis.
///
/// Units are cells of the finest level (`world_extent / 2^max_depth`), so
/// bounds of cells at different levels are directly comparable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridBounds {
  /// Inclusive lower corner.
  pub min: [u32; 3],
  /// Exclusive upper corner.
  pub max: [u32; 3],
}

impl GridBounds {
  /// Whether `other` lies inside these bounds.
  pub fn contains(&self, other: &GridBounds) -> bool {
    (0..3).all(|axis| self.min[axis] <= other.min[axis] && other.max[axis] <= self.max[axis])
  }

  /// Whether `other` lies inside these bounds and is smaller.
  pub fn strictly_contains(&self, other: &GridBounds) -> bool {
    self.contains(other) && self != other
  }

  /// Whether the two bounds share any grid cell.
  pub fn overlaps(&self, other: &GridBounds) -> bool {
    (0..3).all(|axis| self.min[axis] < other.max[axis] && other.min[axis] < self.max[axis])
  }

  /// Number of finest-level grid cells covered.
  pub fn volume(&self) -> u64 {
    (0..3)
      .map(|axis| (self.max[axis] - self.min[axis]) as u64)
      .product()
  }
}
