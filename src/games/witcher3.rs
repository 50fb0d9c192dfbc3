use anyhow::Result;

use crate::binding::GameAttributes;
use crate::features::{BasicSaveGameInfo, GameFeatures};
use crate::game::GameModule;

pub fn create() -> Result<GameModule> {
    let attrs = GameAttributes {
        name: Some("Witcher 3 Support Plugin".into()),
        author: Some("Holt59".into()),
        version: Some("1.0.0a".into()),
        description: Some("The Description Of The Dead".into()),
        game_name: Some("The Witcher 3".into()),
        game_short_name: Some("witcher3".into()),
        binary_name: Some("bin/x64/witcher3.exe".into()),
        data_directory: Some("Mods".into()),
        saves_directory: Some("%GAME_DOCUMENTS%/gamesaves".into()),
        savegame_extension: Some("sav".into()),
        steam_ids: Some("292030".into()),
        gog_ids: Some("1207664663,1495134320,1640424747".into()),
        ..Default::default()
    };

    let module = GameModule::new("witcher3", attrs)?.with_features(GameFeatures {
        // Saves keep a screenshot next to them: `.sav` -> `.png`.
        save_game_info: Some(Box::new(BasicSaveGameInfo::new(Some("png".into())))),
        ..Default::default()
    });
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saves::SaveGame;

    #[test]
    fn save_preview_sits_next_to_the_save() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AutoSave_1.sav"), b"").unwrap();
        std::fs::write(dir.path().join("AutoSave_1.png"), b"").unwrap();

        let game = create().unwrap();
        let info = game.save_game_info().unwrap();
        let save = SaveGame::new(dir.path().join("AutoSave_1.sav"));
        assert_eq!(info.preview(&save), Some(dir.path().join("AutoSave_1.png")));
    }

    #[test]
    fn data_directory_is_the_mods_subfolder_of_the_install() {
        use crate::stores::{Discovery, StoreEntries, StoreKind};
        use std::path::PathBuf;

        let steam: StoreEntries = [("292030".to_string(), PathBuf::from("/games/witcher3"))]
            .into_iter()
            .collect();
        let discovery = Discovery::from_entries(vec![(StoreKind::Steam, steam)]);
        let mut game = create().unwrap();
        assert!(game.detect_game(&discovery));
        assert_eq!(game.data_directory(), PathBuf::from("/games/witcher3/Mods"));
    }
}
