use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use log::warn;

use super::persist::{self, MapFile};
use super::settings::EditorSettings;

/// Local map storage: the maps a user can reopen by name.
pub trait MapStore {
    fn get_map_list(&self) -> anyhow::Result<Vec<String>>;
    fn has_map(&self, name: &str) -> bool;
    fn get_map_data(&self, name: &str) -> anyhow::Result<MapFile>;
    fn save_map(&mut self, file: &MapFile) -> anyhow::Result<()>;
}

pub(crate) fn validate_name(name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        bail!("map name is empty");
    }
    if name.starts_with('.') || name.contains(['/', '\\', ':']) {
        bail!("map name {:?} cannot be used as a file name", name);
    }
    Ok(())
}

/// Keeps maps in memory; `read_only` makes every save fail.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    maps: BTreeMap<String, MapFile>,
    read_only: bool,
}

impl MemoryStore {
    pub fn set_read_only(&mut self, read_only: bool) { self.read_only = read_only; }
}

impl MapStore for MemoryStore {
    fn get_map_list(&self) -> anyhow::Result<Vec<String>> { Ok(self.maps.keys().cloned().collect()) }

    fn has_map(&self, name: &str) -> bool { self.maps.contains_key(name) }

    fn get_map_data(&self, name: &str) -> anyhow::Result<MapFile> {
        self.maps.get(name).cloned().ok_or_else(|| anyhow!("map {} does not exist", name))
    }

    fn save_map(&mut self, file: &MapFile) -> anyhow::Result<()> {
        if self.read_only {
            bail!("store is read-only");
        }
        validate_name(&file.name)?;
        self.maps.insert(file.name.clone(), file.clone());
        Ok(())
    }
}

/// One RON file per map in a directory, with optional timestamped copies
/// under `versions/`.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    dir: PathBuf,
    keep_versions: bool,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into(), keep_versions: false } }

    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self { dir: settings.storage_dir(), keep_versions: settings.keep_versions }
    }

    pub fn with_versions(mut self, keep: bool) -> Self {
        self.keep_versions = keep;
        self
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn map_path(&self, name: &str) -> PathBuf { self.dir.join(format!("{}.ron", name)) }

    fn versions_dir(&self) -> PathBuf { self.dir.join("versions") }

    /// Saved copies of `name`, newest first.
    pub fn list_versions(&self, name: &str) -> anyhow::Result<Vec<PathBuf>> {
        let dir = self.versions_dir();
        let prefix = format!("{}_", name);
        let mut entries: Vec<PathBuf> = Vec::new();
        if dir.exists() {
            for e in fs::read_dir(dir)? {
                let p = e?.path();
                if let Some(file_name) = p.file_name().and_then(|s| s.to_str())
                    && file_name.starts_with(&prefix) && file_name.ends_with(".ron")
                {
                    entries.push(p);
                }
            }
        }
        // sort descending by filename (timestamp)
        entries.sort();
        entries.reverse();
        Ok(entries)
    }
}

impl MapStore for DirectoryStore {
    fn get_map_list(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        if self.dir.exists() {
            for e in fs::read_dir(&self.dir)? {
                let p = e?.path();
                if p.is_file()
                    && p.extension().is_some_and(|ext| ext == "ron")
                    && let Some(stem) = p.file_stem().and_then(|s| s.to_str())
                {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn has_map(&self, name: &str) -> bool { validate_name(name).is_ok() && self.map_path(name).is_file() }

    fn get_map_data(&self, name: &str) -> anyhow::Result<MapFile> {
        validate_name(name)?;
        persist::load_ron(&self.map_path(name))
    }

    fn save_map(&mut self, file: &MapFile) -> anyhow::Result<()> {
        validate_name(&file.name)?;
        persist::save_ron(file, &self.map_path(&file.name))?;
        if self.keep_versions {
            let path = self
                .versions_dir()
                .join(format!("{}_{}.ron", file.name, persist::version_stamp_now()));
            // the primary copy is already written; a failed backup is not fatal
            if let Err(e) = persist::save_ron(file, &path) {
                warn!("could not write version {}: {}", path.display(), e);
            }
        }
        Ok(())
    }
}
