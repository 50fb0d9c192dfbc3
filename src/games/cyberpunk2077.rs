use anyhow::Result;
use indexmap::IndexMap;

use crate::binding::GameAttributes;
use crate::checker::BasicModDataChecker;
use crate::features::{BasicLocalSavegames, GameFeatures, LocalSavegames};
use crate::game::GameModule;
use crate::patterns::GlobPatterns;

const SAVES_DIR: &str = "%USERPROFILE%/Saved Games/CD Projekt Red/Cyberpunk 2077";

fn checker_patterns() -> GlobPatterns {
    GlobPatterns {
        valid: vec![
            "archive".into(),
            "bin".into(),
            "engine".into(),
            "mods".into(),
            "r6".into(),
            "red4ext".into(),
        ],
        delete: vec![
            "*.txt".into(),
            "*.md".into(),
            "license".into(),
        ],
        move_map: IndexMap::from([("*.archive".to_string(), "archive/pc/mod/".to_string())]),
        ..Default::default()
    }
}

pub fn create() -> Result<GameModule> {
    let attrs = GameAttributes {
        name: Some("Cyberpunk 2077 Support Plugin".into()),
        author: Some("6788, Zash".into()),
        version: Some("1.3.0".into()),
        game_name: Some("Cyberpunk 2077".into()),
        game_short_name: Some("cyberpunk2077".into()),
        binary_name: Some("bin/x64/Cyberpunk2077.exe".into()),
        launcher_name: Some("REDprelauncher.exe".into()),
        data_directory: Some("%GAME_PATH%".into()),
        documents_directory: Some(
            "%USERPROFILE%/AppData/Local/CD Projekt Red/Cyberpunk 2077".into(),
        ),
        saves_directory: Some(SAVES_DIR.into()),
        savegame_extension: Some("dat".into()),
        steam_ids: Some("1091500".into()),
        gog_ids: Some("1423049311".into()),
        epic_ids: Some("77f2b98e2cef40c8a7437518bf420e47".into()),
        support_url: Some(
            "https://github.com/ModOrganizer2/modorganizer-basic_games/wiki/Game:-Cyberpunk-2077"
                .into(),
        ),
        ..Default::default()
    };

    let mut module = GameModule::new("cyberpunk2077", attrs)?;
    let features = GameFeatures {
        mod_data_checker: Some(Box::new(BasicModDataChecker::new(checker_patterns())?)),
        local_savegames: module
            .saves_directory()
            .map(|dir| Box::new(BasicLocalSavegames::new(dir)) as Box<dyn LocalSavegames>),
        ..Default::default()
    };
    module = module.with_features(features);
    Ok(module)
}
