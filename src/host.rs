use std::path::{Path, PathBuf};

/// A virtual-filesystem mapping handed to the host. `is_directory` entries
/// are created on the game side when missing; `create_target` additionally
/// asks the host to create the destination before the overlay mounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub is_directory: bool,
    pub create_target: bool,
}

impl Mapping {
    pub fn file(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            is_directory: false,
            create_target: false,
        }
    }

    pub fn directory(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            is_directory: true,
            create_target: true,
        }
    }
}

/// One mod in the host's profile order. Priority is positional; earlier
/// entries deploy first and later entries win conflicts.
#[derive(Debug, Clone)]
pub struct ActiveMod {
    pub name: String,
    pub path: PathBuf,
    pub enabled: bool,
}

impl ActiveMod {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            enabled: true,
        }
    }
}

/// The host's current profile as seen by game modules: mods in priority
/// order plus the profile's own directory.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub path: PathBuf,
    pub mods: Vec<ActiveMod>,
}

impl Profile {
    pub fn active_mods(&self) -> impl Iterator<Item = &ActiveMod> {
        self.mods.iter().filter(|m| m.enabled)
    }
}

/// What the host wants initialized when a profile is created.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileSettings {
    pub configuration: bool,
}

/// Everything a feature object may need from the host and the owning game
/// module, passed by value so features hold no back-references.
#[derive(Debug, Clone)]
pub struct MappingContext<'a> {
    pub game_path: &'a Path,
    pub documents_path: Option<&'a Path>,
    pub overwrite_path: &'a Path,
    pub profile: &'a Profile,
}
