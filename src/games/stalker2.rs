use std::path::Path;

use anyhow::Result;
use indexmap::IndexMap;

use crate::binding::GameAttributes;
use crate::checker::BasicModDataChecker;
use crate::features::{
    BasicLocalSavegames, Diagnostics, FileMapper, GameFeatures, LocalSavegames, Problem,
};
use crate::game::GameModule;
use crate::host::{Mapping, MappingContext};
use crate::patterns::GlobPatterns;
use crate::rootmap::{RootMapper, RootRoute};

const PAKS_MODS_SUBTREE: &str = "Stalker2/Content/Paks/~mods";

fn checker_patterns() -> GlobPatterns {
    GlobPatterns {
        valid: vec!["Content".into(), "Paks".into(), "~mods".into()],
        move_map: IndexMap::from([
            ("*.pak".to_string(), "Content/Paks/~mods/".to_string()),
            ("*.utoc".to_string(), "Content/Paks/~mods/".to_string()),
            ("*.ucas".to_string(), "Content/Paks/~mods/".to_string()),
        ]),
        ..Default::default()
    }
}

pub fn create() -> Result<GameModule> {
    let attrs = GameAttributes {
        name: Some("Stalker 2: Heart of Chornobyl Plugin".into()),
        author: Some("MkHaters".into()),
        version: Some("1.1.0".into()),
        game_name: Some("Stalker 2: Heart of Chornobyl".into()),
        game_short_name: Some("stalker2heartofchornobyl".into()),
        game_nexus_name: Some("stalker2heartofchornobyl".into()),
        nexus_game_id: Some(6944.into()),
        binary_name: Some("Stalker2.exe".into()),
        data_directory: Some("%GAME_PATH%/Stalker2".into()),
        documents_directory: Some("%USERPROFILE%/AppData/Local/Stalker2".into()),
        saves_directory: Some("%GAME_DOCUMENTS%/Saved/Steam/SaveGames/Data".into()),
        savegame_extension: Some("sav".into()),
        steam_ids: Some("1643320".into()),
        gog_ids: Some("1529799785".into()),
        ini_files: Some(
            "%GAME_DOCUMENTS%/Saved/Config/Windows/Game.ini,\
             %GAME_DOCUMENTS%/Saved/Config/Windows/GameUserSettings.ini,\
             %GAME_DOCUMENTS%/Saved/Config/Windows/Engine.ini"
                .into(),
        ),
        ..Default::default()
    };

    let mut module = GameModule::new("stalker2heartofchornobyl", attrs)?;
    let features = GameFeatures {
        mod_data_checker: Some(Box::new(BasicModDataChecker::new(checker_patterns())?)),
        local_savegames: module
            .saves_directory()
            .map(|dir| Box::new(BasicLocalSavegames::new(dir)) as Box<dyn LocalSavegames>),
        file_mapper: Some(Box::new(PaksFileMapper)),
        diagnostics: Some(Box::new(PaksDiagnostics)),
        ..Default::default()
    };
    module = module.with_features(features);
    Ok(module)
}

/// Routes each mod's `Content/Paks/~mods` subtree into the game's paks
/// directory; the usual data-directory projection cannot reach it.
struct PaksFileMapper;

impl FileMapper for PaksFileMapper {
    fn mappings(&self, ctx: &MappingContext<'_>) -> Result<Vec<Mapping>> {
        let mapper = RootMapper::new(
            ctx.game_path,
            vec![RootRoute::new("Content/Paks/~mods", PAKS_MODS_SUBTREE)],
        );
        let mut mappings = vec![Mapping::directory(
            ctx.overwrite_path,
            ctx.game_path.join(PAKS_MODS_SUBTREE),
        )];
        mappings.extend(mapper.direct_mappings(&ctx.profile.mods));
        Ok(mappings)
    }
}

struct PaksDiagnostics;

impl Diagnostics for PaksDiagnostics {
    fn active_problems(&self, game_path: Option<&Path>) -> Vec<Problem> {
        let Some(game_path) = game_path else {
            return Vec::new();
        };
        let mut problems = Vec::new();
        if !game_path.join(PAKS_MODS_SUBTREE).is_dir() {
            problems.push(Problem {
                key: "missing-mod-directories".into(),
                short_description: "Required mod directories are missing.".into(),
                full_description: format!(
                    "The game folder has no {PAKS_MODS_SUBTREE} directory, so pak mods cannot load."
                ),
            });
        }
        problems
    }
}
