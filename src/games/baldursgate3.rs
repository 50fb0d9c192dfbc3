use anyhow::Result;

use crate::binding::GameAttributes;
use crate::features::{FileMapper, GameFeatures};
use crate::game::GameModule;
use crate::host::{Mapping, MappingContext};
use crate::rootmap::{RootMapper, RootRoute};

pub fn create() -> Result<GameModule> {
    let attrs = GameAttributes {
        name: Some("Baldur's Gate 3 Support Plugin".into()),
        author: Some("MO2 Team".into()),
        version: Some("1.0.0".into()),
        game_name: Some("Baldur's Gate 3".into()),
        game_short_name: Some("baldursgate3".into()),
        binary_name: Some("bin/bg3.exe".into()),
        // Pak mods live on the documents side, not under the game root.
        data_directory: Some("%GAME_DOCUMENTS%/Mods".into()),
        documents_directory: Some("%LOCALAPPDATA%/Larian Studios/Baldur's Gate 3".into()),
        saves_directory: Some(
            "%GAME_DOCUMENTS%/PlayerProfiles/Public/Savegames/Story".into(),
        ),
        savegame_extension: Some("lsv".into()),
        steam_ids: Some("1086940".into()),
        gog_ids: Some("1456460669".into()),
        ..Default::default()
    };

    let module = GameModule::new("baldursgate3", attrs)?.with_features(GameFeatures {
        file_mapper: Some(Box::new(DocumentsFileMapper)),
        ..Default::default()
    });
    Ok(module)
}

/// Projects the documents-side pieces of each active mod: Script Extender
/// configs and player profiles go next to the paks, and everything the game
/// regenerates is steered into the overwrite area.
struct DocumentsFileMapper;

impl FileMapper for DocumentsFileMapper {
    fn mappings(&self, ctx: &MappingContext<'_>) -> Result<Vec<Mapping>> {
        let Some(docs) = ctx.documents_path else {
            return Ok(Vec::new());
        };
        let mapper = RootMapper::new(
            docs,
            vec![
                RootRoute::new("Script Extender", "Script Extender"),
                RootRoute::new("PlayerProfiles", "PlayerProfiles"),
            ],
        );
        let mut mappings = vec![Mapping::directory(ctx.overwrite_path, docs.join("Mods"))];
        mappings.extend(mapper.direct_mappings(&ctx.profile.mods));
        Ok(mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ActiveMod, Profile};
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn script_extender_configs_map_into_documents() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        let mod_dir = dir.path().join("mods/SE Mod");
        fs::create_dir_all(mod_dir.join("Script Extender")).unwrap();
        fs::write(mod_dir.join("Script Extender/config.json"), b"{}").unwrap();

        let game = create().unwrap();
        let profile = Profile {
            path: PathBuf::new(),
            mods: vec![ActiveMod::new("SE Mod", &mod_dir)],
        };
        let game_root = dir.path().join("game");
        let overwrite = dir.path().join("overwrite");
        let ctx = MappingContext {
            game_path: &game_root,
            documents_path: Some(&docs),
            overwrite_path: &overwrite,
            profile: &profile,
        };

        let mappings = game.file_mapper().unwrap().mappings(&ctx).unwrap();
        assert_eq!(mappings[0].destination, docs.join("Mods"));
        assert!(mappings
            .iter()
            .any(|m| m.destination == docs.join("Script Extender/config.json")));
    }

    #[test]
    fn without_documents_dir_nothing_is_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let game = create().unwrap();
        let profile = Profile::default();
        let game_root = dir.path().join("game");
        let overwrite = dir.path().join("overwrite");
        let ctx = MappingContext {
            game_path: &game_root,
            documents_path: None,
            overwrite_path: &overwrite,
            profile: &profile,
        };
        assert!(game.file_mapper().unwrap().mappings(&ctx).unwrap().is_empty());
    }
}
