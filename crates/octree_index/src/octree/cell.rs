//! CellId - immutable value type naming one cell of the octree address space.
//!
//! A cell is the path of octant choices taken from the root. The path is
//! packed into a `u64` location code: a sentinel `1` bit followed by three
//! bits per level, coarsest level first. The root is therefore `0b1`, and
//! `parent`/`child` are plain shifts.
//!
//! ```text
//! bit 63        : border flag (see `border_variant`)
//! bits 62..61   : unused
//! bits 60..0    : 1 sentinel bit + 3 bits x level (max 20 levels)
//! ```
//!
//! The string form is `R` followed by one octal digit per level, so every
//! ancestor's string is a literal prefix of its descendants' strings and
//! lexicographic order is a pre-order walk of the tree. A border variant
//! appends `B`.
//!
//! `Ord` follows the same pre-order walk, so the strict descendants of a cell
//! form one contiguous run directly after it in any ordered collection.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{IndexError, Result};

/// Deepest level a `u64` location code can address.
pub const MAX_KEY_DEPTH: u8 = 20;

const BORDER_BIT: u64 = 1 << 63;
const PATH_MASK: u64 = !BORDER_BIT;
const ROOT_CHAR: char = 'R';
const BORDER_CHAR: char = 'B';

/// Octree cell identifier - immutable value type.
///
/// Octant: 0-7 where bits represent +X, +Y, +Z offsets:
/// - bit 0: X offset (0 or 1)
/// - bit 1: Y offset (0 or 1)
/// - bit 2: Z offset (0 or 1)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u64);

impl CellId {
  /// The cell covering the whole world bounding box.
  pub const ROOT: Self = Self(1);

  /// Rebuild a cell from its raw location code.
  pub fn from_raw(raw: u64) -> Result<Self> {
    let path = raw & PATH_MASK;
    if path == 0 {
      return Err(IndexError::MalformedCellId {
        input: format!("{raw:#x}"),
        reason: "missing sentinel bit",
      });
    }
    let bits = 63 - path.leading_zeros();
    if bits % 3 != 0 {
      return Err(IndexError::MalformedCellId {
        input: format!("{raw:#x}"),
        reason: "sentinel bit is not level-aligned",
      });
    }
    let level = bits / 3;
    if level > MAX_KEY_DEPTH as u32 {
      return Err(IndexError::DepthExceeded {
        level: level as i32,
        max_depth: MAX_KEY_DEPTH,
      });
    }
    Ok(Self(raw))
  }

  /// Build a cell from a root-first list of octants.
  pub fn from_path(octants: &[u8]) -> Result<Self> {
    octants
      .iter()
      .try_fold(Self::ROOT, |cell, &octant| cell.child(octant))
  }

  /// Build the cell at `level` whose grid coordinates (at that level) are
  /// `x`, `y`, `z`. Coordinates must be below `2^level`.
  pub fn from_grid(x: u32, y: u32, z: u32, level: u8) -> Result<Self> {
    if level > MAX_KEY_DEPTH {
      return Err(IndexError::DepthExceeded {
        level: level as i32,
        max_depth: MAX_KEY_DEPTH,
      });
    }
    let side = 1u32 << level;
    if x >= side || y >= side || z >= side {
      return Err(IndexError::MalformedCellId {
        input: format!("({x}, {y}, {z}) at level {level}"),
        reason: "grid coordinate out of range for level",
      });
    }
    let mut cell = Self::ROOT;
    for shift in (0..level).rev() {
      let octant = ((x >> shift) & 1) | (((y >> shift) & 1) << 1) | (((z >> shift) & 1) << 2);
      cell = cell.child(octant as u8)?;
    }
    Ok(cell)
  }

  /// Raw location code, including the border flag.
  #[inline]
  pub fn raw(&self) -> u64 {
    self.0
  }

  #[inline]
  fn path_bits(&self) -> u64 {
    self.0 & PATH_MASK
  }

  /// Number of octant steps from the root (0 for the root).
  #[inline]
  pub fn level(&self) -> u8 {
    ((63 - self.path_bits().leading_zeros()) / 3) as u8
  }

  /// Whether this is the root cell (border flag ignored).
  #[inline]
  pub fn is_root(&self) -> bool {
    self.path_bits() == 1
  }

  /// Get the parent cell (one level coarser).
  ///
  /// The result never carries the border flag. Fails at the root.
  pub fn parent(&self) -> Result<Self> {
    if self.is_root() {
      return Err(IndexError::DepthExceeded {
        level: -1,
        max_depth: MAX_KEY_DEPTH,
      });
    }
    Ok(Self(self.path_bits() >> 3))
  }

  /// Get the child cell selecting `octant` (one level finer).
  ///
  /// Fails for octants outside `0..8` and when the child would be deeper
  /// than [`MAX_KEY_DEPTH`]. Depth limits of a particular index are enforced
  /// by [`OctreeSpace::child`](super::OctreeSpace::child).
  pub fn child(&self, octant: u8) -> Result<Self> {
    if octant >= 8 {
      return Err(IndexError::MalformedCellId {
        input: format!("{self}/{octant}"),
        reason: "octant must be in 0..8",
      });
    }
    let level = self.level() + 1;
    if level > MAX_KEY_DEPTH {
      return Err(IndexError::DepthExceeded {
        level: level as i32,
        max_depth: MAX_KEY_DEPTH,
      });
    }
    Ok(Self((self.path_bits() << 3) | octant as u64))
  }

  /// The last octant on the path, `None` for the root.
  pub fn octant(&self) -> Option<u8> {
    if self.is_root() {
      None
    } else {
      Some((self.path_bits() & 7) as u8)
    }
  }

  /// Octants from the root down to this cell.
  pub fn path(&self) -> impl Iterator<Item = u8> {
    let bits = self.path_bits();
    (0..self.level())
      .rev()
      .map(move |step| ((bits >> (3 * step as u32)) & 7) as u8)
  }

  /// Grid coordinates of this cell at its own level.
  pub fn grid_coords(&self) -> (u32, u32, u32) {
    self.path().fold((0, 0, 0), |(x, y, z), octant| {
      (
        x * 2 + (octant & 1) as u32,
        y * 2 + ((octant >> 1) & 1) as u32,
        z * 2 + ((octant >> 2) & 1) as u32,
      )
    })
  }

  /// Whether `self` is a strict ancestor of `other`.
  pub fn is_ancestor_of(&self, other: &CellId) -> bool {
    let (mine, theirs) = (self.level(), other.level());
    if theirs <= mine {
      return false;
    }
    let shift = 3 * (theirs - mine) as u32;
    other.path_bits() >> shift == self.path_bits()
  }

  /// Whether `self` equals `other` or is one of its ancestors.
  pub fn contains(&self, other: &CellId) -> bool {
    self.path_bits() == other.path_bits() || self.is_ancestor_of(other)
  }

  /// The deepest cell containing both `self` and `other`.
  pub fn common_ancestor(&self, other: &CellId) -> CellId {
    let (mut a, mut b) = (self.path_bits(), other.path_bits());
    let (la, lb) = (self.level(), other.level());
    if la > lb {
      a >>= 3 * (la - lb) as u32;
    } else {
      b >>= 3 * (lb - la) as u32;
    }
    while a != b {
      a >>= 3;
      b >>= 3;
    }
    CellId(a)
  }

  /// Whether the border flag is set.
  #[inline]
  pub fn is_border(&self) -> bool {
    self.0 & BORDER_BIT != 0
  }

  /// The identifier used for the other side of a partition seam.
  ///
  /// Persisted rows may record a cell either plainly or flagged as lying on
  /// a seam. Range queries over the persisted form must match both, so
  /// lookups probe a cell and its border variant. Toggles the flag.
  #[inline]
  pub fn border_variant(&self) -> Self {
    Self(self.0 ^ BORDER_BIT)
  }

  /// This cell without the border flag.
  #[inline]
  pub fn canonical(&self) -> Self {
    Self(self.path_bits())
  }

  /// Sort key of the pre-order walk: the path left-aligned to
  /// [`MAX_KEY_DEPTH`] levels, then the level (ancestors first), then the
  /// border flag.
  fn preorder_key(&self) -> (u64, u8, bool) {
    let level = self.level();
    let steps = self.path_bits() ^ (1 << (3 * level as u32));
    let aligned = steps << (3 * (MAX_KEY_DEPTH - level) as u32);
    (aligned, level, self.is_border())
  }
}

impl Ord for CellId {
  fn cmp(&self, other: &Self) -> Ordering {
    self.preorder_key().cmp(&other.preorder_key())
  }
}

impl PartialOrd for CellId {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for CellId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut out = String::with_capacity(self.level() as usize + 2);
    out.push(ROOT_CHAR);
    for octant in self.path() {
      out.push(char::from(b'0' + octant));
    }
    if self.is_border() {
      out.push(BORDER_CHAR);
    }
    f.write_str(&out)
  }
}

impl fmt::Debug for CellId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "CellId({self})")
  }
}

impl FromStr for CellId {
  type Err = IndexError;

  fn from_str(input: &str) -> Result<Self> {
    let malformed = |reason| IndexError::MalformedCellId {
      input: input.to_owned(),
      reason,
    };
    let body = input
      .strip_prefix(ROOT_CHAR)
      .ok_or_else(|| malformed("must start with 'R'"))?;
    let (digits, border) = match body.strip_suffix(BORDER_CHAR) {
      Some(digits) => (digits, true),
      None => (body, false),
    };
    if digits.len() > MAX_KEY_DEPTH as usize {
      return Err(IndexError::DepthExceeded {
        level: digits.len() as i32,
        max_depth: MAX_KEY_DEPTH,
      });
    }
    let mut cell = CellId::ROOT;
    for byte in digits.bytes() {
      if !(b'0'..=b'7').contains(&byte) {
        return Err(malformed("octants must be digits 0-7"));
      }
      cell = cell.child(byte - b'0')?;
    }
    Ok(if border { cell.border_variant() } else { cell })
  }
}

#[cfg(test)]
#[path = "cell_test.rs"]
mod cell_test;
