use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::binding::{BindingError, GameAttributes, GameBindings, OptionsMapping};
use crate::checker::ModDataChecker;
use crate::features::{Diagnostics, FileMapper, GameFeatures, LocalSavegames, SaveGameInfo};
use crate::host::ProfileSettings;
use crate::paths::{self, ResolveContext};
use crate::saves::{self, SaveGame};
use crate::stores::{Discovery, StoreKind};

/// One launchable entry the host shows for the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub title: String,
    pub binary: PathBuf,
}

/// A game-support plugin: one installed (or installable) game the host can
/// manage. Bindings are immutable after construction; the game path is the
/// only mutable piece of state and is set at most once per activation.
pub struct GameModule {
    module_id: String,
    attrs: GameAttributes,
    bindings: GameBindings,
    features: GameFeatures,
    forced_libraries: Vec<String>,
    game_path: Option<PathBuf>,
}

impl GameModule {
    pub fn new(module_id: impl Into<String>, attrs: GameAttributes) -> Result<Self, BindingError> {
        let module_id = module_id.into();
        let bindings = GameBindings::bind(&module_id, attrs.clone())?;
        Ok(Self {
            module_id,
            attrs,
            bindings,
            features: GameFeatures::default(),
            forced_libraries: Vec::new(),
            game_path: None,
        })
    }

    pub fn with_features(mut self, features: GameFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn features_mut(&mut self) -> &mut GameFeatures {
        &mut self.features
    }

    pub fn with_forced_libraries(mut self, libraries: Vec<String>) -> Self {
        self.forced_libraries = libraries;
        self
    }

    /// Re-bind with `over` layered on top of the module's own attributes.
    /// The overlay wins on every field it sets.
    pub fn apply_overlay(&mut self, over: GameAttributes) -> Result<(), BindingError> {
        let attrs = self.attrs.clone().overlay(over);
        self.bindings = GameBindings::bind(&self.module_id, attrs.clone())?;
        self.attrs = attrs;
        Ok(())
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn bindings(&self) -> &GameBindings {
        &self.bindings
    }

    // Identity, straight from the bindings.

    pub fn name(&self) -> &str {
        &self.bindings.name
    }

    pub fn author(&self) -> &str {
        &self.bindings.author
    }

    pub fn version(&self) -> &str {
        &self.bindings.version
    }

    pub fn description(&self) -> &str {
        &self.bindings.description
    }

    pub fn game_name(&self) -> &str {
        &self.bindings.game_name
    }

    pub fn game_short_name(&self) -> &str {
        &self.bindings.game_short_name
    }

    pub fn game_nexus_name(&self) -> &str {
        &self.bindings.game_nexus_name
    }

    pub fn nexus_game_id(&self) -> u32 {
        self.bindings.nexus_game_id
    }

    pub fn valid_short_names(&self) -> &[String] {
        &self.bindings.valid_short_names
    }

    pub fn forced_libraries(&self) -> &[String] {
        &self.forced_libraries
    }

    /// True iff the host's current game is this one, compared by plugin
    /// name.
    pub fn is_active(&self, current_game: Option<&str>) -> bool {
        current_game == Some(self.name())
    }

    // Detection.

    /// Walk the stores in a fixed order and take the first configured id
    /// with a known install path.
    pub fn detect_game(&mut self, discovery: &Discovery) -> bool {
        for kind in StoreKind::ALL {
            for id in self.store_ids(kind).values().to_vec() {
                if let Some(path) = discovery.install_path(kind, &id) {
                    info!(
                        "{}: detected via {} id {} at {:?}",
                        self.game_name(),
                        kind,
                        id,
                        path
                    );
                    let path = path.to_path_buf();
                    self.set_game_path(&path, discovery);
                    return true;
                }
            }
        }
        debug!("{}: no store entry matched", self.game_name());
        false
    }

    /// Record the game directory and align every store-id mapping whose
    /// entry map knows this path.
    pub fn set_game_path(&mut self, path: &Path, discovery: &Discovery) {
        self.game_path = Some(path.to_path_buf());
        for kind in StoreKind::ALL {
            if let Some(id) = discovery.id_for_path(kind, path) {
                let id = id.to_string();
                self.store_ids_mut(kind).set_value(&id);
            }
        }
    }

    pub fn store_ids(&self, kind: StoreKind) -> &OptionsMapping {
        match kind {
            StoreKind::Steam => &self.bindings.steam_ids,
            StoreKind::Gog => &self.bindings.gog_ids,
            StoreKind::Epic => &self.bindings.epic_ids,
            StoreKind::Origin => &self.bindings.origin_manifest_ids,
            StoreKind::EaDesktop => &self.bindings.ea_desktop_ids,
        }
    }

    fn store_ids_mut(&mut self, kind: StoreKind) -> &mut OptionsMapping {
        match kind {
            StoreKind::Steam => &mut self.bindings.steam_ids,
            StoreKind::Gog => &mut self.bindings.gog_ids,
            StoreKind::Epic => &mut self.bindings.epic_ids,
            StoreKind::Origin => &mut self.bindings.origin_manifest_ids,
            StoreKind::EaDesktop => &mut self.bindings.ea_desktop_ids,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.game_path.is_some()
    }

    pub fn game_path(&self) -> Option<&Path> {
        self.game_path.as_deref()
    }

    // Path accessors, resolved against the recorded game path.

    fn resolve_ctx(&self) -> ResolveContext {
        let mut ctx = ResolveContext::host_defaults();
        if let Some(path) = &self.game_path {
            ctx = ctx.with_game_path(path);
        }
        let docs = self.documents_directory_with(&ctx);
        if let Some(docs) = docs {
            ctx = ctx.with_game_documents(&docs);
        }
        ctx
    }

    pub fn binary_name(&self) -> String {
        paths::resolve(&self.bindings.binary_name, &self.resolve_ctx())
    }

    pub fn launcher_name(&self) -> Option<String> {
        let ctx = self.resolve_ctx();
        self.bindings
            .launcher_name
            .as_deref()
            .map(|launcher| paths::resolve(launcher, &ctx))
    }

    /// Relative declared paths sit under the game directory, so plain
    /// values like `Mods` or `Data` work once the install is known.
    fn under_game_root(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            return path;
        }
        match &self.game_path {
            Some(root) => root.join(path),
            None => path,
        }
    }

    pub fn data_directory(&self) -> PathBuf {
        self.under_game_root(paths::resolve_path(
            &self.bindings.data_directory,
            &self.resolve_ctx(),
        ))
    }

    /// The game's configuration directory. A declared value wins; without
    /// one, `Documents/My Games/<name>` and `Documents/<name>` are probed
    /// and the first existing candidate is used.
    pub fn documents_directory(&self) -> Option<PathBuf> {
        let mut ctx = ResolveContext::host_defaults();
        if let Some(path) = &self.game_path {
            ctx = ctx.with_game_path(path);
        }
        self.documents_directory_with(&ctx)
    }

    fn documents_directory_with(&self, ctx: &ResolveContext) -> Option<PathBuf> {
        if let Some(declared) = &self.bindings.documents_directory {
            return Some(self.under_game_root(paths::resolve_path(declared, ctx)));
        }
        let docs = ctx.documents.as_ref()?;
        let candidates = [
            docs.join("My Games").join(self.game_name()),
            docs.join(self.game_name()),
        ];
        candidates
            .iter()
            .find(|candidate| candidate.is_dir())
            .cloned()
            .or_else(|| Some(candidates[0].clone()))
    }

    /// Where the game keeps saves; defaults to the documents directory.
    pub fn saves_directory(&self) -> Option<PathBuf> {
        match &self.bindings.saves_directory {
            Some(declared) => {
                Some(self.under_game_root(paths::resolve_path(declared, &self.resolve_ctx())))
            }
            None => self.documents_directory(),
        }
    }

    pub fn savegame_extension(&self) -> &str {
        &self.bindings.savegame_extension
    }

    pub fn ini_files(&self) -> Vec<String> {
        let ctx = self.resolve_ctx();
        self.bindings
            .ini_files
            .iter()
            .map(|file| paths::resolve(file, &ctx))
            .collect()
    }

    pub fn support_url(&self) -> Option<&str> {
        self.bindings.support_url.as_deref()
    }

    /// Launcher first when one is declared, then the primary binary.
    pub fn executables(&self) -> Vec<Executable> {
        let root = self.game_path.clone().unwrap_or_default();
        let mut executables = Vec::new();
        if let Some(launcher) = self.launcher_name() {
            executables.push(Executable {
                title: format!("{} Launcher", self.game_name()),
                binary: root.join(launcher),
            });
        }
        executables.push(Executable {
            title: self.game_name().to_string(),
            binary: root.join(self.binary_name()),
        });
        executables
    }

    pub fn list_saves(&self, folder: &Path) -> Vec<SaveGame> {
        saves::list_saves(folder, self.savegame_extension())
    }

    /// Copy each declared INI file from the game's documents directory into
    /// a fresh profile. A missing source becomes an empty file so the
    /// profile always carries the full set.
    pub fn initialize_profile(&self, profile_dir: &Path, settings: ProfileSettings) -> Result<()> {
        if !settings.configuration {
            return Ok(());
        }
        let documents = self.documents_directory();
        for ini_file in self.ini_files() {
            let mut source = PathBuf::from(&ini_file);
            if !source.is_absolute() {
                if let Some(docs) = &documents {
                    source = docs.join(source);
                }
            }
            let Some(file_name) = source.file_name() else {
                continue;
            };
            let target = profile_dir.join(file_name);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create profile dir {parent:?}"))?;
            }
            if source.is_file() {
                fs::copy(&source, &target)
                    .with_context(|| format!("copy profile ini {source:?}"))?;
            } else {
                fs::write(&target, b"")
                    .with_context(|| format!("create empty profile ini {target:?}"))?;
            }
        }
        Ok(())
    }

    /// Version of the installed game. File-version resources only exist on
    /// Windows binaries; elsewhere, and for a missing binary, this is
    /// unknown.
    pub fn game_version(&self) -> Option<String> {
        let root = self.game_path.as_deref()?;
        let binary = root.join(self.binary_name());
        binary.is_file().then(|| String::new())
    }

    /// A directory looks like this game iff it contains the primary binary.
    pub fn looks_valid(&self, dir: &Path) -> bool {
        dir.join(self.binary_name()).is_file()
    }

    // Typed feature getters.

    pub fn mod_data_checker(&self) -> Option<&dyn ModDataChecker> {
        self.features.mod_data_checker.as_deref()
    }

    pub fn local_savegames(&self) -> Option<&dyn LocalSavegames> {
        self.features.local_savegames.as_deref()
    }

    pub fn save_game_info(&self) -> Option<&dyn SaveGameInfo> {
        self.features.save_game_info.as_deref()
    }

    pub fn file_mapper(&self) -> Option<&dyn FileMapper> {
        self.features.file_mapper.as_deref()
    }

    pub fn diagnostics(&self) -> Option<&dyn Diagnostics> {
        self.features.diagnostics.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::StoreEntries;

    fn bg3_attrs() -> GameAttributes {
        GameAttributes {
            name: Some("Baldur's Gate 3 Support Plugin".into()),
            author: Some("MO2 Team".into()),
            version: Some("1.0.0".into()),
            game_name: Some("Baldur's Gate 3".into()),
            game_short_name: Some("baldursgate3".into()),
            binary_name: Some("bin/bg3.exe".into()),
            data_directory: Some("%GAME_PATH%/Data".into()),
            steam_ids: Some("1086940,1086941".into()),
            ..Default::default()
        }
    }

    fn discovery_with_steam(entries: Vec<(&str, &str)>) -> Discovery {
        let steam: StoreEntries = entries
            .into_iter()
            .map(|(id, path)| (id.to_string(), PathBuf::from(path)))
            .collect();
        Discovery::from_entries(vec![(StoreKind::Steam, steam)])
    }

    #[test]
    fn detect_game_picks_first_configured_id_with_a_hit() {
        let discovery = discovery_with_steam(vec![("1086941", "/games/bg3")]);
        let mut game = GameModule::new("baldursgate3", bg3_attrs()).unwrap();
        assert!(game.detect_game(&discovery));
        assert_eq!(game.game_path(), Some(Path::new("/games/bg3")));
        assert_eq!(game.store_ids(StoreKind::Steam).current(), Some("1086941"));
    }

    #[test]
    fn set_game_path_selects_matching_store_id() {
        let discovery = discovery_with_steam(vec![
            ("1086940", "/games/bg3-release"),
            ("1086941", "/games/bg3-patch"),
        ]);
        let mut game = GameModule::new("baldursgate3", bg3_attrs()).unwrap();
        assert_eq!(game.store_ids(StoreKind::Steam).current(), Some("1086940"));
        game.set_game_path(Path::new("/games/bg3-patch"), &discovery);
        assert_eq!(game.store_ids(StoreKind::Steam).current(), Some("1086941"));
        assert!(game.is_installed());
    }

    #[test]
    fn undetected_game_has_no_path() {
        let discovery = discovery_with_steam(Vec::new());
        let mut game = GameModule::new("baldursgate3", bg3_attrs()).unwrap();
        assert!(!game.detect_game(&discovery));
        assert!(!game.is_installed());
        assert_eq!(game.game_path(), None);
    }

    #[test]
    fn executables_list_launcher_before_binary() {
        let mut attrs = bg3_attrs();
        attrs.launcher_name = Some("Launcher/LariLauncher.exe".into());
        let mut game = GameModule::new("baldursgate3", attrs).unwrap();
        game.game_path = Some(PathBuf::from("/games/bg3"));
        let executables = game.executables();
        assert_eq!(executables.len(), 2);
        assert_eq!(
            executables[0].binary,
            PathBuf::from("/games/bg3/Launcher/LariLauncher.exe")
        );
        assert_eq!(executables[1].binary, PathBuf::from("/games/bg3/bin/bg3.exe"));
    }

    #[test]
    fn data_directory_resolves_game_path_token() {
        let mut game = GameModule::new("baldursgate3", bg3_attrs()).unwrap();
        game.game_path = Some(PathBuf::from("/games/bg3"));
        assert_eq!(game.data_directory(), PathBuf::from("/games/bg3/Data"));
    }

    #[test]
    fn relative_data_directory_resolves_under_game_path() {
        let mut attrs = bg3_attrs();
        attrs.data_directory = Some("Mods".into());
        let mut game = GameModule::new("baldursgate3", attrs).unwrap();
        assert_eq!(game.data_directory(), PathBuf::from("Mods"));
        game.game_path = Some(PathBuf::from("/games/w3"));
        assert_eq!(game.data_directory(), PathBuf::from("/games/w3/Mods"));
    }

    #[test]
    fn looks_valid_requires_binary() {
        let dir = tempfile::tempdir().unwrap();
        let game = GameModule::new("baldursgate3", bg3_attrs()).unwrap();
        assert!(!game.looks_valid(dir.path()));
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/bg3.exe"), b"").unwrap();
        assert!(game.looks_valid(dir.path()));
    }

    #[test]
    fn initialize_profile_creates_missing_ini_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut attrs = bg3_attrs();
        attrs.ini_files = Some("Game.ini,GameUserSettings.ini".into());
        let game = GameModule::new("baldursgate3", attrs).unwrap();
        let profile = dir.path().join("profile");
        game.initialize_profile(&profile, ProfileSettings { configuration: true })
            .unwrap();
        assert!(profile.join("Game.ini").is_file());
        assert!(profile.join("GameUserSettings.ini").is_file());
    }

    #[test]
    fn initialize_profile_copies_ini_from_documents_dir() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("Game.ini"), "[Display]\nWidth=1920\n").unwrap();
        let mut attrs = bg3_attrs();
        attrs.documents_directory = Some(docs.to_string_lossy().into_owned());
        attrs.ini_files = Some("Game.ini".into());
        let game = GameModule::new("baldursgate3", attrs).unwrap();
        let profile = dir.path().join("profile");
        game.initialize_profile(&profile, ProfileSettings { configuration: true })
            .unwrap();
        let copied = std::fs::read_to_string(profile.join("Game.ini")).unwrap();
        assert_eq!(copied, "[Display]\nWidth=1920\n");
    }

    #[test]
    fn is_active_compares_plugin_names() {
        let game = GameModule::new("baldursgate3", bg3_attrs()).unwrap();
        assert!(game.is_active(Some("Baldur's Gate 3 Support Plugin")));
        assert!(!game.is_active(Some("Valheim Support Plugin")));
        assert!(!game.is_active(None));
    }
}
