use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::map_utils::manager::MapManager;
use crate::map_utils::record::NodeSnapshot;

/// Bumped whenever the on-disk layout changes incompatibly.
pub const MAP_FORMAT_VERSION: u32 = 1;

// Files written before the version field existed are version 1.
fn legacy_version() -> u32 { 1 }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapFile {
    #[serde(default = "legacy_version")]
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub saved_at: Option<String>,
    // root-level nodes, each with its nested children
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
}

impl MapFile {
    pub fn from_manager(manager: &MapManager) -> Self {
        Self {
            version: MAP_FORMAT_VERSION,
            name: manager.get_map_name().to_string(),
            saved_at: Some(timestamp_now()),
            nodes: manager.get_map_data(),
        }
    }

    pub fn check_version(&self) -> anyhow::Result<()> {
        if self.version > MAP_FORMAT_VERSION {
            bail!(
                "map {} uses format version {}, newest supported is {}",
                self.name,
                self.version,
                MAP_FORMAT_VERSION
            );
        }
        Ok(())
    }
}

pub fn timestamp_now() -> String {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    OffsetDateTime::now_utc().format(fmt).unwrap_or_else(|_| "unknown".to_string())
}

pub fn version_stamp_now() -> String {
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    OffsetDateTime::now_utc().format(fmt).unwrap_or_else(|_| "unknown".to_string())
}

pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn read_to_string(path: &Path) -> anyhow::Result<String> {
    let mut f = File::open(path).map_err(|e| anyhow!("cannot open {}: {}", path.display(), e))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(buf)
}

pub fn to_ron(file: &MapFile) -> anyhow::Result<String> {
    let pretty = PrettyConfig::new()
        .separate_tuple_members(true)
        .enumerate_arrays(true);
    Ok(ron::ser::to_string_pretty(file, pretty)?)
}

pub fn from_ron(s: &str) -> anyhow::Result<MapFile> {
    let file: MapFile = ron::from_str(s)?;
    file.check_version()?;
    Ok(file)
}

pub fn load_ron(path: &Path) -> anyhow::Result<MapFile> { from_ron(&read_to_string(path)?) }

pub fn save_ron(file: &MapFile, path: &Path) -> anyhow::Result<()> {
    atomic_write(path, to_ron(file)?.as_bytes())?;
    Ok(())
}

/// Write `file` to `path`: a flat CSV node table for `.csv`, pretty JSON otherwise.
pub fn export_map(file: &MapFile, path: &Path) -> anyhow::Result<PathBuf> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        export_map_csv(file, path)?;
    } else {
        export_map_json(file, path)?;
    }
    Ok(path.to_path_buf())
}

pub fn export_map_json(file: &MapFile, path: &Path) -> anyhow::Result<()> {
    let mut s = serde_json::to_string_pretty(file)?;
    // ensure newline at end
    s.push('\n');
    atomic_write(path, s.as_bytes())?;
    Ok(())
}

pub fn export_map_csv(file: &MapFile, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    // headers: id,parent,x,y,content
    wtr.write_record(["id", "parent", "x", "y", "content"])?;
    let mut stack: Vec<&NodeSnapshot> = file.nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        wtr.write_record([
            node.id.clone().unwrap_or_default(),
            node.parent.clone().unwrap_or_default(),
            node.offset.x.to_string(),
            node.offset.y.to_string(),
            node.content.clone(),
        ])?;
        stack.extend(node.children.iter().rev());
    }
    wtr.flush()?;
    Ok(())
}

pub fn import_map_json(path: &Path) -> anyhow::Result<MapFile> {
    let file: MapFile = serde_json::from_str(&read_to_string(path)?)?;
    file.check_version()?;
    Ok(file)
}
