//! Command line front end for the octree spatial index.
//!
//! Works against a directory of `spatialindex_<model>.tsv` tables:
//!
//! - `build`: index element bounding boxes and write the model's table
//! - `stats`: load a model and print index counts
//! - `locate`: classify one cell (in memory, or straight from the table)
//! - `query`: collect the cells a probe box resolves to
//!
//! Logging is controlled via `RUST_LOG` (tracing-subscriber `EnvFilter`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glam::DVec3;
use octree_index::{
  flush, locate_in_table, BoxCoverage, CellId, DAabb3, ElementKey, IndexConfig, ModelId,
  OctreeIndex, TsvTable, UserOverlay,
};
use tracing::info;

/// Sparse octree spatial index tool.
#[derive(Parser, Debug)]
#[command(name = "octree_tool")]
#[command(about = "Builds and queries octree spatial-index tables")]
struct Cli {
  #[command(flatten)]
  common: Common,

  #[command(subcommand)]
  command: Command,
}

#[derive(Args, Debug)]
struct Common {
  /// Index configuration TOML (defaults apply when omitted).
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Directory holding the spatial-index tables.
  #[arg(short, long, global = true, default_value = ".")]
  table: PathBuf,

  /// Model id.
  #[arg(short, long, global = true, default_value_t = 1)]
  model: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Index `element<TAB>x,y,z<TAB>x,y,z` boxes and write the model table.
  Build {
    /// Box list file.
    boxes: PathBuf,
  },
  /// Print counts for the loaded model.
  Stats,
  /// Classify one cell.
  Locate {
    /// Cell string, e.g. `R0123`.
    cell: String,
    /// Query the table directly instead of loading the index.
    #[arg(long)]
    cold: bool,
  },
  /// Resolve a probe box against the loaded model.
  Query {
    /// Minimum corner `x,y,z`.
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    min: DVec3,
    /// Maximum corner `x,y,z`.
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    max: DVec3,
    /// Also report the probe cells that resolved through ancestors or
    /// descendants.
    #[arg(long)]
    keep_original: bool,
  },
}

fn parse_vec3(text: &str) -> std::result::Result<DVec3, String> {
  let parts: Vec<&str> = text.split(',').map(str::trim).collect();
  let [x, y, z] = parts.as_slice() else {
    return Err(format!("expected `x,y,z`, got {text:?}"));
  };
  let axis = |v: &str| v.parse::<f64>().map_err(|e| format!("{v:?}: {e}"));
  Ok(DVec3::new(axis(*x)?, axis(*y)?, axis(*z)?))
}

fn load_config(path: Option<&Path>) -> Result<IndexConfig> {
  match path {
    Some(path) => IndexConfig::load(path)
      .with_context(|| format!("Failed to load config: {}", path.display())),
    None => Ok(IndexConfig::default()),
  }
}

fn read_boxes(path: &Path) -> Result<Vec<(ElementKey, DAabb3)>> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read box list: {}", path.display()))?;
  let mut boxes = Vec::new();
  for (number, line) in content.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let fields: Vec<&str> = line.split('\t').collect();
    let [element, min, max] = fields.as_slice() else {
      bail!("{}:{}: expected 3 tab-separated fields", path.display(), number + 1);
    };
    let key: ElementKey = element
      .parse()
      .with_context(|| format!("{}:{}", path.display(), number + 1))?;
    let min = parse_vec3(min).map_err(anyhow::Error::msg)?;
    let max = parse_vec3(max).map_err(anyhow::Error::msg)?;
    if !min.cmple(max).all() {
      bail!("{}:{}: min must not exceed max", path.display(), number + 1);
    }
    boxes.push((key, DAabb3::new(min, max)));
  }
  Ok(boxes)
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,octree_index=info,octree_tool=info".into()),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let config = load_config(cli.common.config.as_deref())?;
  let model = ModelId::new(cli.common.model);
  let mut table = TsvTable::new(&cli.common.table);

  match cli.command {
    Command::Build { boxes } => {
      let boxes = read_boxes(&boxes)?;
      let mut index = OctreeIndex::new(model, config)?;
      for (key, aabb) in &boxes {
        index
          .insert_shape(key, aabb, &BoxCoverage)
          .with_context(|| format!("Failed to index {key}"))?;
      }
      let rows = flush(&index, &mut table)?;
      info!(%model, elements = boxes.len(), rows, "built spatial index");
      println!("{}", table.path_for(model).display());
    }
    Command::Stats => {
      let index = OctreeIndex::load(model, config, &table)
        .with_context(|| format!("Failed to load model {model}"))?;
      let stats = index.stats();
      println!("cells\t{}", stats.cells);
      println!("leaves\t{}", stats.leaves);
      println!("nodes\t{}", stats.nodes);
      println!("elements\t{}", stats.elements);
      println!("memberships\t{}", stats.memberships);
    }
    Command::Locate { cell, cold } => {
      let cell: CellId = cell.parse()?;
      let located = if cold {
        locate_in_table(&table, model, cell, config.max_depth)?
      } else {
        OctreeIndex::load(model, config, &table)?.locate(cell)
      };
      println!("{located:?}");
    }
    Command::Query {
      min,
      max,
      keep_original,
    } => {
      if !min.cmple(max).all() {
        bail!("--min must not exceed --max");
      }
      let index = OctreeIndex::load(model, config, &table)
        .with_context(|| format!("Failed to load model {model}"))?;
      let mut overlay = UserOverlay::new(&index);
      let probe = ElementKey::new("probe", 0);
      overlay.insert_shape(&probe, &DAabb3::new(min, max), &BoxCoverage, keep_original)?;
      for record in overlay.collect()? {
        let touching: Vec<String> = index
          .elements_touching(record.cell.parse()?)
          .into_iter()
          .map(|handle| index.element_key(handle).map(ToString::to_string))
          .collect::<octree_index::Result<_>>()?;
        println!(
          "{}\t{}\t{:?}\t{:?}\t{}\t{}",
          record.cell,
          record.kind.code(),
          record.bounds.min,
          record.bounds.max,
          record.depth,
          touching.join(",")
        );
      }
    }
  }
  Ok(())
}
