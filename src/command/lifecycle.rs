//! Map-level commands: creating, opening, saving and renaming. None of these
//! enter the history.

use std::path::PathBuf;

use log::info;

use crate::error::CommandError;
use crate::map_utils::manager::MapManager;
use crate::map_utils::map::MindMap;
use crate::persistence::persist::{self, MapFile};
use crate::persistence::store::validate_name;
use crate::session::{EditingSurface, Workspace};

use super::open_map;

/// Ask until the answer is non-empty; `None` means the user backed out.
fn prompt_name(surface: &mut dyn EditingSurface, message: &str, default: &str) -> Option<String> {
    loop {
        match surface.prompt(message, default) {
            Some(name) if name.is_empty() => continue,
            other => return other,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateNewMap {
    pub name: Option<String>,
}

impl CreateNewMap {
    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<bool, CommandError> {
        let name = match self.name.clone().filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => match prompt_name(ws.surface.as_mut(), "map name", &ws.settings.default_map_name) {
                Some(name) => name,
                None => return Ok(false),
            },
        };
        validate_name(&name)?;
        info!("created map {}", name);
        ws.map = Some(MindMap::new(MapManager::new(name))?);
        Ok(true)
    }
}

#[derive(Clone, Debug)]
pub struct OpenMapInStorage {
    pub name: String,
}

impl OpenMapInStorage {
    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let file = ws.store.get_map_data(&self.name)?;
        let manager = MapManager::from_map_file(file)?;
        info!("opened map {} ({} nodes) from storage", manager.get_map_name(), manager.node_count());
        ws.map = Some(MindMap::new(manager)?);
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct OpenMapInDisk {
    pub path: PathBuf,
}

impl OpenMapInDisk {
    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let file = persist::import_map_json(&self.path)?;
        let manager = MapManager::from_map_file(file)?;
        info!("opened map {} from {}", manager.get_map_name(), self.path.display());
        ws.map = Some(MindMap::new(manager)?);
        Ok(())
    }
}

/// Save to local storage under the current name.
pub(crate) fn save_map(ws: &mut Workspace) -> Result<(), CommandError> {
    let Workspace { map, store, .. } = ws;
    let map = map.as_mut().ok_or(CommandError::NoMap)?;
    map.manager_mut().save_map(store.as_mut())?;
    info!("saved map {} to storage", map.manager().get_map_name());
    Ok(())
}

/// Save to local storage, optionally under a new name. The map only takes
/// the new name once the store accepted it.
#[derive(Clone, Debug)]
pub struct SaveMapInStorage {
    pub name: Option<String>,
}

impl SaveMapInStorage {
    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let Some(name) = self.name.clone().filter(|n| !n.is_empty()) else {
            return save_map(ws);
        };
        let Workspace { map, store, .. } = ws;
        let map = map.as_mut().ok_or(CommandError::NoMap)?;
        validate_name(&name)?;
        let mut file = MapFile::from_manager(map.manager());
        file.name = name.clone();
        store.save_map(&file)?;
        let manager = map.manager_mut();
        manager.set_map_name(name);
        manager.mark_saved();
        info!("saved map as {}", manager.get_map_name());
        Ok(())
    }
}

/// Export to a file. The format follows the extension (`.csv` or JSON).
#[derive(Clone, Debug)]
pub struct SaveMapInDisk {
    pub path: Option<PathBuf>,
}

impl SaveMapInDisk {
    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<(), CommandError> {
        let export_dir = ws.settings.export_dir();
        let map = open_map(ws)?;
        let file = MapFile::from_manager(map.manager());
        let path = match self.path.clone() {
            Some(path) => path,
            None => {
                validate_name(&file.name)?;
                export_dir.join(format!("{}.json", file.name))
            }
        };
        let written = persist::export_map(&file, &path)?;
        map.manager_mut().mark_saved();
        info!("saved map {} to {}", file.name, written.display());
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct RenameMap {
    pub name: Option<String>,
}

impl RenameMap {
    pub(crate) fn apply(&mut self, ws: &mut Workspace) -> Result<bool, CommandError> {
        let name = match self.name.clone().filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => {
                let current = open_map(ws)?.manager().get_map_name().to_string();
                match prompt_name(ws.surface.as_mut(), "new map name", &current) {
                    Some(name) => name,
                    None => return Ok(false),
                }
            }
        };
        validate_name(&name)?;
        open_map(ws)?.manager_mut().set_map_name(name);
        Ok(true)
    }
}
