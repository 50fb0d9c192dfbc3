use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use walkdir::WalkDir;

use crate::host::{ActiveMod, Mapping};

/// One route from a subtree of every active mod into a subtree of the game
/// root, e.g. `Content/Paks/~mods` -> `<game>/Stalker2/Content/Paks/~mods`.
#[derive(Debug, Clone)]
pub struct RootRoute {
    pub mod_subtree: PathBuf,
    pub target_subtree: PathBuf,
}

impl RootRoute {
    pub fn new(mod_subtree: impl Into<PathBuf>, target_subtree: impl Into<PathBuf>) -> Self {
        Self {
            mod_subtree: mod_subtree.into(),
            target_subtree: target_subtree.into(),
        }
    }
}

/// Produces launch-time mappings for games whose mods land in several
/// disjoint places under the game root.
pub struct RootMapper {
    pub game_root: PathBuf,
    pub routes: Vec<RootRoute>,
}

impl RootMapper {
    pub fn new(game_root: impl Into<PathBuf>, routes: Vec<RootRoute>) -> Self {
        Self {
            game_root: game_root.into(),
            routes,
        }
    }

    /// Direct mappings: every file keeps its relative path under the route
    /// target. Files already present in the game directory are never
    /// clobbered; such mappings are dropped with a warning.
    pub fn direct_mappings(&self, mods: &[ActiveMod]) -> Vec<Mapping> {
        let mut mappings = Vec::new();
        for route in &self.routes {
            let target_root = self.game_root.join(&route.target_subtree);
            for active in mods.iter().filter(|m| m.enabled) {
                let source_root = active.path.join(&route.mod_subtree);
                if !source_root.is_dir() {
                    continue;
                }
                mappings.push(Mapping::directory(&source_root, &target_root));
                for (file, rel) in files_under(&source_root) {
                    let Some(destination) = contained_join(&target_root, &rel) else {
                        warn!(
                            "mod {}: refusing mapping escaping the game root: {rel:?}",
                            active.name
                        );
                        continue;
                    };
                    if destination.is_file() {
                        warn!(
                            "mod {}: {destination:?} is a game file, refusing to overwrite",
                            active.name
                        );
                        continue;
                    }
                    mappings.push(Mapping::file(file, destination));
                }
            }
        }
        mappings
    }

    /// Load-order-encoded mappings: top-level entries of the routed subtree
    /// get a zero-padded priority prefix so their alphabetical order equals
    /// the host's mod order.
    pub fn prefixed_mappings(&self, mods: &[ActiveMod]) -> Vec<Mapping> {
        let active: Vec<&ActiveMod> = mods.iter().filter(|m| m.enabled).collect();
        if active.is_empty() {
            return Vec::new();
        }
        let width = priority_digits(active.len());
        let mut mappings = Vec::new();
        for route in &self.routes {
            let target_root = self.game_root.join(&route.target_subtree);
            for (priority, active_mod) in active.iter().enumerate() {
                let source_root = active_mod.path.join(&route.mod_subtree);
                let Ok(entries) = fs::read_dir(&source_root) else {
                    continue;
                };
                let prefix = format!("{priority:0width$}_");
                let mut children: Vec<PathBuf> =
                    entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
                children.sort();
                for child in children {
                    let Some(name) = child.file_name() else {
                        continue;
                    };
                    let destination =
                        target_root.join(format!("{prefix}{}", name.to_string_lossy()));
                    if child.is_dir() {
                        mappings.push(Mapping::directory(child, destination));
                    } else {
                        mappings.push(Mapping::file(child, destination));
                    }
                }
            }
        }
        mappings
    }
}

/// Width of the priority prefix: the digit count of the largest index.
pub fn priority_digits(mod_count: usize) -> usize {
    let max_index = mod_count.saturating_sub(1);
    let mut digits = 1;
    let mut value = max_index;
    while value >= 10 {
        digits += 1;
        value /= 10;
    }
    digits
}

fn files_under(root: &Path) -> Vec<(PathBuf, PathBuf)> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?.to_path_buf();
            Some((entry.path().to_path_buf(), rel))
        })
        .collect()
}

/// Join `rel` under `root`, rejecting any path that would step outside.
fn contained_join(root: &Path, rel: &Path) -> Option<PathBuf> {
    if rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return None;
    }
    Some(root.join(rel))
}

/// The ordered file list of one mod-type, pinned to a text file the game's
/// loader reads. Below two entries the file is removed; ordering a single
/// file is meaningless.
pub struct ModlistFileManager {
    pub directory: PathBuf,
    pub file_name: String,
}

/// Result of a modlist update; callers compare `previous` and `current` to
/// decide whether dependent caches must be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModlistUpdate {
    pub previous: Vec<String>,
    pub current: Vec<String>,
    pub path: PathBuf,
}

impl ModlistFileManager {
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    pub fn update(&self, files: &[String]) -> Result<ModlistUpdate> {
        let path = self.path();
        let previous = match fs::read_to_string(&path) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        };

        if files.len() < 2 {
            if path.exists() {
                fs::remove_file(&path).with_context(|| format!("remove modlist {path:?}"))?;
            }
            return Ok(ModlistUpdate {
                previous,
                current: Vec::new(),
                path,
            });
        }

        fs::create_dir_all(&self.directory)
            .with_context(|| format!("create modlist dir {:?}", self.directory))?;
        // One newline between entries, none at the end.
        fs::write(&path, files.join("\n")).with_context(|| format!("write modlist {path:?}"))?;
        Ok(ModlistUpdate {
            previous,
            current: files.to_vec(),
            path,
        })
    }
}
