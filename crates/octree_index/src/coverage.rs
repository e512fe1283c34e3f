//! Coverage - turning element geometry into the cells it occupies.
//!
//! Geometry kernels (polyhedra, faces, line segments) live outside this
//! crate and plug in through [`CellCoverage`]. [`BoxCoverage`] covers
//! axis-aligned boxes and is enough for bounding-box indexing.

use crate::error::Result;
use crate::octree::{CellId, DAabb3, OctreeSpace};

/// One cell produced by a coverage pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CoveredCell {
  /// Covered cell (canonical form).
  pub cell: CellId,
  /// Whether the shape only partially overlaps the cell.
  pub border: bool,
}

/// Computes the cells a shape occupies within an octree space.
pub trait CellCoverage<S: ?Sized> {
  /// Cells covered by `shape`, none deeper than `space.max_depth()`.
  fn cover(&self, shape: &S, space: &OctreeSpace) -> Result<Vec<CoveredCell>>;
}

/// Blanket impl for boxed trait objects.
impl<S: ?Sized> CellCoverage<S> for Box<dyn CellCoverage<S>> {
  fn cover(&self, shape: &S, space: &OctreeSpace) -> Result<Vec<CoveredCell>> {
    (**self).cover(shape, space)
  }
}

/// Recursive coverage of axis-aligned boxes.
///
/// Starts at the smallest cell containing the box. Cells fully inside the
/// box are emitted whole; partially covered cells are subdivided, and those
/// still partial at max depth are emitted with `border = true`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoxCoverage;

impl CellCoverage<DAabb3> for BoxCoverage {
  fn cover(&self, shape: &DAabb3, space: &OctreeSpace) -> Result<Vec<CoveredCell>> {
    let Some(clipped) = space.world().intersection(shape) else {
      return Ok(Vec::new());
    };
    let start = space.smallest_containing_cell(&clipped)?;
    let mut out = Vec::new();
    cover_box(&clipped, start, space, &mut out)?;
    Ok(out)
  }
}

fn cover_box(
  shape: &DAabb3,
  cell: CellId,
  space: &OctreeSpace,
  out: &mut Vec<CoveredCell>,
) -> Result<()> {
  let bounds = space.world_bounds(cell);
  if !touches(shape, &bounds) {
    return Ok(());
  }
  if shape.contains_aabb(&bounds) {
    out.push(CoveredCell {
      cell,
      border: false,
    });
    return Ok(());
  }
  if cell.level() >= space.max_depth() {
    out.push(CoveredCell { cell, border: true });
    return Ok(());
  }
  for child in space.children(cell)? {
    cover_box(shape, child, space, out)?;
  }
  Ok(())
}

/// Whether `shape` reaches into `cell`.
///
/// Axes where the shape has extent need interior overlap, so a box ending
/// on a cell face does not claim the neighbour. Flat axes (walls, slabs of
/// zero thickness) only need the plane to lie within the cell's slab.
fn touches(shape: &DAabb3, cell: &DAabb3) -> bool {
  (0..3).all(|axis| {
    let (lo, hi) = (shape.min[axis], shape.max[axis]);
    let (cell_lo, cell_hi) = (cell.min[axis], cell.max[axis]);
    if hi > lo {
      lo < cell_hi && cell_lo < hi
    } else {
      cell_lo <= lo && lo <= cell_hi
    }
  })
}

#[cfg(test)]
#[path = "coverage_test.rs"]
mod coverage_test;
