use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::checker::ModDataChecker;
use crate::host::{Mapping, MappingContext};
use crate::saves::SaveGame;

/// Redirects the game's save directory into the profile when the profile
/// keeps local saves.
pub trait LocalSavegames: Send + Sync {
    /// Mappings projecting the profile's saves folder over the game's one.
    fn mappings(&self, profile_save_dir: &Path) -> Vec<Mapping>;

    /// Seed a fresh profile's saves folder. Returns true when anything was
    /// copied.
    fn prepare_profile(&self, profile_save_dir: &Path) -> Result<bool>;
}

/// Stock implementation: the whole save directory maps to the profile.
pub struct BasicLocalSavegames {
    saves_dir: PathBuf,
}

impl BasicLocalSavegames {
    pub fn new(saves_dir: impl Into<PathBuf>) -> Self {
        Self {
            saves_dir: saves_dir.into(),
        }
    }
}

impl LocalSavegames for BasicLocalSavegames {
    fn mappings(&self, profile_save_dir: &Path) -> Vec<Mapping> {
        vec![Mapping::directory(profile_save_dir, &self.saves_dir)]
    }

    fn prepare_profile(&self, profile_save_dir: &Path) -> Result<bool> {
        if profile_save_dir.exists() {
            return Ok(false);
        }
        fs::create_dir_all(profile_save_dir)
            .with_context(|| format!("create profile saves dir {profile_save_dir:?}"))?;
        Ok(true)
    }
}

/// Supplies preview metadata for a save the host shows in its save list.
pub trait SaveGameInfo: Send + Sync {
    /// A picture file shown next to the save, when the game keeps one.
    fn preview(&self, save: &SaveGame) -> Option<PathBuf>;
}

/// Derives the preview path from the save path, e.g. `.sav` -> `.png`.
pub struct BasicSaveGameInfo {
    preview_extension: Option<String>,
}

impl BasicSaveGameInfo {
    pub fn new(preview_extension: Option<String>) -> Self {
        Self { preview_extension }
    }
}

impl SaveGameInfo for BasicSaveGameInfo {
    fn preview(&self, save: &SaveGame) -> Option<PathBuf> {
        let ext = self.preview_extension.as_deref()?;
        let preview = save.path.with_extension(ext);
        preview.is_file().then_some(preview)
    }
}

/// Produces per-launch VFS mappings for games whose mod layout cannot be a
/// single data directory.
pub trait FileMapper: Send + Sync {
    fn mappings(&self, ctx: &MappingContext<'_>) -> Result<Vec<Mapping>>;
}

/// A problem the game module wants the host to surface to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub key: String,
    pub short_description: String,
    pub full_description: String,
}

/// Reports installation problems (missing runtime directories, conflicting
/// loaders) the host lists in its diagnostics panel.
pub trait Diagnostics: Send + Sync {
    fn active_problems(&self, game_path: Option<&Path>) -> Vec<Problem>;
}

/// The optional feature objects a game module owns. The host reaches them
/// only through the typed getters on the game module.
#[derive(Default)]
pub struct GameFeatures {
    pub mod_data_checker: Option<Box<dyn ModDataChecker>>,
    pub local_savegames: Option<Box<dyn LocalSavegames>>,
    pub save_game_info: Option<Box<dyn SaveGameInfo>>,
    pub file_mapper: Option<Box<dyn FileMapper>>,
    pub diagnostics: Option<Box<dyn Diagnostics>>,
}
