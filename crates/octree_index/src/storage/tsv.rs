//! Tab-separated spatial table: one `spatialindex_<model>.tsv` per model.
//!
//! ```text
//! # element<TAB>cell
//! 3vB2YO$MX4xv5uCqZZG05x<TAB>R0123
//! 3vB2YO$MX4xv5uCqZZG05x#1<TAB>R0124B
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{DescendantQuery, SpatialRow, SpatialTable};
use crate::error::{IndexError, Result};
use crate::model::ModelId;

const HEADER: &str = "# element\tcell";

/// Directory of per-model TSV files.
#[derive(Clone, Debug)]
pub struct TsvTable {
  dir: PathBuf,
}

impl TsvTable {
  /// Table rooted at `dir`. The directory is created on first write.
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Directory holding the model files.
  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// File holding the rows of `model`.
  pub fn path_for(&self, model: ModelId) -> PathBuf {
    self.dir.join(format!("spatialindex_{model}.tsv"))
  }

  fn io_error(path: &Path, source: std::io::Error) -> IndexError {
    IndexError::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// Parse one file's contents. A missing tab is a storage failure naming the
/// line number.
fn parse_rows(model: ModelId, content: &str) -> Result<Vec<SpatialRow>> {
  let mut rows = Vec::new();
  for (number, line) in content.lines().enumerate() {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() || line.starts_with('#') {
      continue;
    }
    let Some((element, cell)) = line.split_once('\t') else {
      return Err(IndexError::storage(
        model,
        format!("line {}: expected `element<TAB>cell`, got {line:?}", number + 1),
      ));
    };
    rows.push(SpatialRow {
      cell: cell.trim().to_owned(),
      element: element.trim().to_owned(),
    });
  }
  Ok(rows)
}

impl SpatialTable for TsvTable {
  fn rows(&self, model: ModelId) -> Result<Vec<SpatialRow>> {
    let path = self.path_for(model);
    if !path.exists() {
      debug!(%model, path = %path.display(), "no spatial index file");
      return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path).map_err(|e| Self::io_error(&path, e))?;
    parse_rows(model, &content)
  }

  fn has_cell(&self, model: ModelId, cell: &str) -> Result<bool> {
    Ok(self.rows(model)?.iter().any(|row| row.cell == cell))
  }

  fn cells_after_prefix(&self, model: ModelId, prefix: &str) -> Result<Vec<String>> {
    let query = DescendantQuery {
      prefix: prefix.to_owned(),
    };
    let cells: BTreeSet<String> = self
      .rows(model)?
      .into_iter()
      .filter(|row| query.matches(&row.cell))
      .map(|row| row.cell)
      .collect();
    Ok(cells.into_iter().collect())
  }

  fn write_rows(&mut self, model: ModelId, rows: &[SpatialRow]) -> Result<()> {
    fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
    let path = self.path_for(model);
    let file = fs::File::create(&path).map_err(|e| Self::io_error(&path, e))?;
    let mut out = BufWriter::new(file);
    let write = |out: &mut BufWriter<fs::File>| -> std::io::Result<()> {
      writeln!(out, "{HEADER}")?;
      for row in rows {
        writeln!(out, "{}\t{}", row.element, row.cell)?;
      }
      out.flush()
    };
    write(&mut out).map_err(|e| Self::io_error(&path, e))?;
    debug!(%model, rows = rows.len(), path = %path.display(), "wrote spatial index");
    Ok(())
  }
}
