use std::path::Path;

use anyhow::Result;
use indexmap::IndexMap;
use log::{info, warn};

use crate::binding::GameAttributes;
use crate::features::{BasicLocalSavegames, BasicSaveGameInfo};
use crate::game::GameModule;
use crate::ini::IniFile;

/// Builds one game module. Factories are registered explicitly; there is no
/// runtime discovery of native modules.
pub type GameFactory = fn() -> Result<GameModule>;

#[derive(Default)]
pub struct GameRegistry {
    factories: IndexMap<&'static str, GameFactory>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module_id: &'static str, factory: GameFactory) {
        self.factories.insert(module_id, factory);
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Instantiate every registered factory, then overlay and extend with the
/// declarative `*.ini` games found in `games_dir`.
///
/// An INI whose `GameShortName` matches an already-built module reconfigures
/// that module (the INI wins on every field it sets); any other INI becomes
/// a stand-alone declarative game. A broken factory or INI is logged and
/// skipped, never failing the rest of the load.
pub fn load_games(registry: &GameRegistry, games_dir: Option<&Path>) -> Vec<GameModule> {
    let mut games: Vec<GameModule> = Vec::new();

    for (module_id, factory) in &registry.factories {
        match factory() {
            Ok(game) => games.push(game),
            Err(err) => warn!("game module {module_id} failed to load: {err:#}"),
        }
    }

    if let Some(dir) = games_dir {
        for path in ini_files(dir) {
            if let Err(err) = load_ini_game(&path, &mut games) {
                warn!("declarative game {path:?} failed to load: {err:#}");
            }
        }
    }

    info!("loaded {} game modules", games.len());
    games
}

fn ini_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("ini"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

fn load_ini_game(path: &Path, games: &mut Vec<GameModule>) -> Result<()> {
    let ini = IniFile::from_file(path)?;
    let section = ini
        .section("BasicGame")
        .or_else(|| ini.section("DEFAULT"))
        .ok_or_else(|| anyhow::anyhow!("no [BasicGame] or [DEFAULT] section"))?;
    let attrs = GameAttributes::from_ini_section(section);

    let short_name = attrs.game_short_name.clone().unwrap_or_default();
    if let Some(existing) = games
        .iter_mut()
        .find(|game| game.game_short_name().eq_ignore_ascii_case(&short_name))
    {
        existing.apply_overlay(attrs)?;
        apply_ini_features(existing, &ini);
        return Ok(());
    }

    let module_id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let mut game = GameModule::new(module_id, attrs)?;
    apply_ini_features(&mut game, &ini);
    games.push(game);
    Ok(())
}

/// `[Features]` selects stock feature objects for a declarative game.
fn apply_ini_features(game: &mut GameModule, ini: &IniFile) {
    let Some(section) = ini.section("Features") else {
        return;
    };

    if let Some(value) = section.get("LocalSavegames").cloned() {
        match parse_feature_flag(&value) {
            FeatureFlag::Enabled => {
                if let Some(saves_dir) = game.saves_directory() {
                    game.features_mut().local_savegames =
                        Some(Box::new(BasicLocalSavegames::new(saves_dir)));
                }
            }
            FeatureFlag::Path(path) => {
                game.features_mut().local_savegames =
                    Some(Box::new(BasicLocalSavegames::new(path)));
            }
            FeatureFlag::Disabled => game.features_mut().local_savegames = None,
        }
    }

    if let Some(value) = section.get("SaveGamePreview") {
        let extension = value.rsplit('.').next().unwrap_or(value).to_string();
        game.features_mut().save_game_info = Some(Box::new(BasicSaveGameInfo::new(Some(extension))));
    }
}

enum FeatureFlag {
    Enabled,
    Disabled,
    Path(String),
}

fn parse_feature_flag(value: &str) -> FeatureFlag {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => FeatureFlag::Enabled,
        "false" | "0" | "no" => FeatureFlag::Disabled,
        _ => FeatureFlag::Path(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_ini(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn loads_declarative_games_from_ini_files() {
        let dir = tempfile::tempdir().unwrap();
        write_ini(
            dir.path(),
            "game_witcher3.ini",
            "[BasicGame]\nName = Witcher 3 Support Plugin\nAuthor = Holt59\nVersion = 1.0.0\nGameName = The Witcher 3\nGameShortName = witcher3\nGameBinary = bin/x64/witcher3.exe\nGameDataPath = Mods\nGameSteamId = 292030\n",
        );
        let games = load_games(&GameRegistry::new(), Some(dir.path()));
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_name(), "The Witcher 3");
        assert_eq!(games[0].module_id(), "game_witcher3");
    }

    #[test]
    fn default_section_is_a_fallback() {
        let dir = tempfile::tempdir().unwrap();
        write_ini(
            dir.path(),
            "game.ini",
            "[DEFAULT]\nName = Plugin\nAuthor = Someone\nVersion = 1.0\nGameName = Game\nGameShortName = game\nGameBinary = game.exe\nGameDataPath = Data\n",
        );
        let games = load_games(&GameRegistry::new(), Some(dir.path()));
        assert_eq!(games.len(), 1);
    }

    #[test]
    fn broken_ini_does_not_poison_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        write_ini(dir.path(), "broken.ini", "[BasicGame]\nName = No Binary\n");
        write_ini(
            dir.path(),
            "ok.ini",
            "[BasicGame]\nName = Plugin\nAuthor = Someone\nVersion = 1.0\nGameName = Game\nGameShortName = game\nGameBinary = game.exe\nGameDataPath = Data\n",
        );
        let games = load_games(&GameRegistry::new(), Some(dir.path()));
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_name(), "Game");
    }

    #[test]
    fn ini_overlays_matching_factory_module() {
        fn factory() -> Result<GameModule> {
            let attrs = GameAttributes {
                name: Some("Game Support Plugin".into()),
                author: Some("Someone".into()),
                version: Some("1.0".into()),
                game_name: Some("Game".into()),
                game_short_name: Some("game".into()),
                binary_name: Some("game.exe".into()),
                data_directory: Some("Data".into()),
                ..Default::default()
            };
            Ok(GameModule::new("game", attrs)?)
        }
        let mut registry = GameRegistry::new();
        registry.register("game", factory);

        let dir = tempfile::tempdir().unwrap();
        write_ini(
            dir.path(),
            "game.ini",
            "[BasicGame]\nGameShortName = game\nVersion = 2.0\n",
        );
        let games = load_games(&registry, Some(dir.path()));
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].version(), "2.0");
        assert_eq!(games[0].author(), "Someone");
    }

    #[test]
    fn features_section_selects_save_preview() {
        let dir = tempfile::tempdir().unwrap();
        write_ini(
            dir.path(),
            "game.ini",
            "[BasicGame]\nName = Plugin\nAuthor = Someone\nVersion = 1.0\nGameName = Game\nGameShortName = game\nGameBinary = game.exe\nGameDataPath = Data\n\n[Features]\nSaveGamePreview = *.png\n",
        );
        let games = load_games(&GameRegistry::new(), Some(dir.path()));
        assert!(games[0].save_game_info().is_some());
    }
}
