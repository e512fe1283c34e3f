//! Element identities and the dense handles the index stores instead.
//!
//! A single element commonly occupies many leaf cells; each cell holds a
//! small integer rather than the full composite identity.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{IndexError, Result};

const PART_SEPARATOR: char = '#';

/// Bytes escaped in the id of the string form: the part separator, the
/// escape byte, spaces and controls (tabs and newlines delimit table
/// columns and rows). Non-ASCII is always escaped.
const ID_ESCAPES: &AsciiSet = &CONTROLS.add(b' ').add(b'#').add(b'%');

/// Composite element identity: a stable element id plus a sub-part index
/// for multi-part elements.
///
/// String form is `"<id>"` for part 0 and `"<id>#<part>"` otherwise, with
/// the id percent-encoded so any id survives a trip through the persisted
/// table: `"a#1"` part 0 is `"a%231"`, `"has space"` is `"has%20space"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ElementKey {
  /// Stable element id (e.g. an IFC GlobalId).
  pub id: String,
  /// Sub-part index, 0 for single-part elements.
  pub part: u32,
}

impl ElementKey {
  /// Create a key for part `part` of element `id`.
  pub fn new(id: impl Into<String>, part: u32) -> Self {
    Self {
      id: id.into(),
      part,
    }
  }
}

impl fmt::Display for ElementKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let id = utf8_percent_encode(&self.id, ID_ESCAPES);
    if self.part == 0 {
      write!(f, "{id}")
    } else {
      write!(f, "{id}{PART_SEPARATOR}{}", self.part)
    }
  }
}

impl FromStr for ElementKey {
  type Err = IndexError;

  fn from_str(input: &str) -> Result<Self> {
    let malformed = || IndexError::MalformedElementKey {
      input: input.to_owned(),
    };
    let (id, part) = match input.rsplit_once(PART_SEPARATOR) {
      Some((id, part)) => (id, part.parse::<u32>().map_err(|_| malformed())?),
      None => (input, 0),
    };
    if id.is_empty() || id.contains(PART_SEPARATOR) || id.chars().any(char::is_whitespace) {
      return Err(malformed());
    }
    let id = percent_decode_str(id)
      .decode_utf8()
      .map_err(|_| malformed())?;
    Ok(Self::new(id, part))
  }
}

/// Dense, zero-based handle bound to one [`ElementKey`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ElementHandle(u32);

impl ElementHandle {
  /// Wrap a raw handle value.
  pub const fn new(raw: u32) -> Self {
    Self(raw)
  }

  /// Position of the handle in the interner's dense table.
  #[inline]
  pub fn index(&self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for ElementHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Append-only bidirectional map between element keys and handles.
///
/// Handles are assigned 0, 1, 2, ... in first-seen order and are never
/// reused or renumbered for the lifetime of one build.
#[derive(Clone, Debug, Default)]
pub struct ElementInterner {
  keys: Vec<ElementKey>,
  handles: HashMap<ElementKey, ElementHandle>,
}

impl ElementInterner {
  /// Create an empty interner.
  pub fn new() -> Self {
    Self::default()
  }

  /// Create an empty interner with room for `capacity` elements.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      keys: Vec::with_capacity(capacity),
      handles: HashMap::with_capacity(capacity),
    }
  }

  /// Handle for `key`, assigning the next one on first sight.
  pub fn get_or_assign(&mut self, key: &ElementKey) -> ElementHandle {
    if let Some(&handle) = self.handles.get(key) {
      return handle;
    }
    debug_assert!(self.keys.len() < u32::MAX as usize, "handle space exhausted");
    let handle = ElementHandle(self.keys.len() as u32);
    self.keys.push(key.clone());
    self.handles.insert(key.clone(), handle);
    handle
  }

  /// Handle for `key` if it was assigned.
  pub fn get(&self, key: &ElementKey) -> Option<ElementHandle> {
    self.handles.get(key).copied()
  }

  /// Key bound to `handle`.
  pub fn lookup(&self, handle: ElementHandle) -> Result<&ElementKey> {
    self
      .keys
      .get(handle.index())
      .ok_or(IndexError::UnknownHandle(handle))
  }

  /// Number of assigned handles.
  pub fn len(&self) -> usize {
    self.keys.len()
  }

  /// Whether no handle has been assigned.
  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }

  /// Iterate `(handle, key)` pairs in handle order.
  pub fn iter(&self) -> impl Iterator<Item = (ElementHandle, &ElementKey)> {
    self
      .keys
      .iter()
      .enumerate()
      .map(|(i, key)| (ElementHandle(i as u32), key))
  }

  /// Forget every assignment (used when the active model changes).
  pub fn clear(&mut self) {
    self.keys.clear();
    self.handles.clear();
  }
}

#[cfg(test)]
#[path = "interner_test.rs"]
mod interner_test;
