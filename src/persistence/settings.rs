use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::map_utils::record::Offset;

const SETTINGS_FILE: &str = "settings.json";
const LEGACY_SETTINGS_FILE: &str = "settings.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    // If None, use OS default storage directory
    #[serde(default)]
    pub storage_override: Option<PathBuf>,
    // If None, use OS temporary directory for disk saves
    #[serde(default)]
    pub export_override: Option<PathBuf>,
    // Steps taken by one undo/redo from the shell
    #[serde(default = "EditorSettings::default_undo_level")]
    pub undo_level: usize,
    // Offset of a subtree pasted under another node
    #[serde(default = "EditorSettings::default_paste_offset")]
    pub paste_offset: Offset,
    #[serde(default = "EditorSettings::default_map_name")]
    pub default_map_name: String,
    // Write a timestamped copy next to every storage save
    #[serde(default = "EditorSettings::default_true")]
    pub keep_versions: bool,
    // env_logger filter used when RUST_LOG is unset
    #[serde(default = "EditorSettings::default_log_filter")]
    pub log_filter: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            storage_override: None,
            export_override: None,
            undo_level: Self::default_undo_level(),
            paste_offset: Self::default_paste_offset(),
            default_map_name: Self::default_map_name(),
            keep_versions: Self::default_true(),
            log_filter: Self::default_log_filter(),
        }
    }
}

impl EditorSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Mind-Loom
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Mind-Loom");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Mind-Loom
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Mind-Loom");
            }
            return PathBuf::from("Mind-Loom");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Mind-Loom or ~/.config/Mind-Loom
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Mind-Loom");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Mind-Loom");
        }
    }

    fn storage_default_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Mind-Loom").join("Maps");
        }
        #[cfg(target_os = "windows")]
        {
            // %LOCALAPPDATA%\Mind-Loom\Maps else APPDATA
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join("Mind-Loom").join("Maps");
            }
            return Self::config_dir().join("Maps");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_DATA_HOME/mind-loom/maps or ~/.local/share/mind-loom/maps
            if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
                return PathBuf::from(xdg).join("mind-loom").join("maps");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("share").join("mind-loom").join("maps");
            }
            return PathBuf::from("/tmp").join("Mind-Loom").join("maps");
        }
    }

    pub fn load() -> anyhow::Result<Self> { Self::load_from(&Self::config_dir()) }

    pub fn save(&self) -> anyhow::Result<()> { self.save_to(&Self::config_dir()) }

    /// Read `settings.json` from `dir`, migrating a legacy `settings.ron`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let json_path = dir.join(SETTINGS_FILE);
        if json_path.exists() {
            let mut f = fs::File::open(json_path)?;
            let mut s = String::new();
            f.read_to_string(&mut s)?;
            let v: Self = serde_json::from_str(&s)?;
            return Ok(v);
        }
        // Migrate from legacy RON if present
        let ron_path = dir.join(LEGACY_SETTINGS_FILE);
        if ron_path.exists() {
            let mut f = fs::File::open(&ron_path)?;
            let mut s = String::new();
            f.read_to_string(&mut s)?;
            let v: Self = ron::from_str(&s)?;
            // Save immediately to JSON for future reads, ignore errors silently
            let _ = v.save_to(dir);
            return Ok(v);
        }
        Ok(Self::default())
    }

    pub fn save_to(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir)?;
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(dir.join(SETTINGS_FILE))?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Directory where the settings file and shell history live.
    pub fn settings_dir() -> PathBuf { Self::config_dir() }

    /// Effective local storage directory honoring the user override.
    pub fn storage_dir(&self) -> PathBuf {
        if let Some(p) = &self.storage_override { return p.clone(); }
        Self::storage_default_dir()
    }

    /// Default export directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/Mind-Loom/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Mind-Loom");
        p.push("exports");
        p
    }

    /// Effective export directory honoring user override or falling back to OS temp.
    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }

    pub(crate) fn default_undo_level() -> usize { 1 }
    pub(crate) fn default_paste_offset() -> Offset { Offset::new(100.0, 100.0) }
    pub(crate) fn default_map_name() -> String { "untitled".to_string() }
    pub(crate) fn default_true() -> bool { true }
    pub(crate) fn default_log_filter() -> String { "info".to_string() }
}
