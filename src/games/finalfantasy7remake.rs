use anyhow::Result;

use crate::binding::GameAttributes;
use crate::features::{FileMapper, GameFeatures};
use crate::game::GameModule;
use crate::host::{Mapping, MappingContext};
use crate::rootmap::{ModlistFileManager, ModlistUpdate, RootMapper, RootRoute};

const PAKS_MODS_SUBTREE: &str = "End/Content/Paks/~mods";
const PAK_MODLIST_NAME: &str = "pak_files.txt";

pub fn create() -> Result<GameModule> {
    let attrs = GameAttributes {
        name: Some("Final Fantasy VII Remake Support Plugin".into()),
        author: Some("TheUnlocked".into()),
        version: Some("1.0.0".into()),
        game_name: Some("Final Fantasy VII Remake".into()),
        game_short_name: Some("finalfantasy7remake".into()),
        game_nexus_name: Some("finalfantasy7remake".into()),
        binary_name: Some("ff7remake.exe".into()),
        // The data directory is never projected directly; the file mapper
        // below encodes load order into the destination names instead.
        data_directory: Some("_ROOT".into()),
        savegame_extension: Some("sav".into()),
        steam_ids: Some("1462040".into()),
        ..Default::default()
    };

    let module = GameModule::new("finalfantasy7remake", attrs)?.with_features(GameFeatures {
        file_mapper: Some(Box::new(PakOrderMapper)),
        ..Default::default()
    });
    Ok(module)
}

/// The engine loads `~mods` paks alphabetically, so each active mod's paks
/// get a zero-padded priority prefix. The overwrite area maps in unprefixed;
/// regenerated files need no ordering.
struct PakOrderMapper;

impl FileMapper for PakOrderMapper {
    fn mappings(&self, ctx: &MappingContext<'_>) -> Result<Vec<Mapping>> {
        let mods_path = ctx.game_path.join(PAKS_MODS_SUBTREE);
        let mapper = RootMapper::new(ctx.game_path, vec![RootRoute::new("", PAKS_MODS_SUBTREE)]);
        let mut mappings = vec![Mapping::directory(ctx.overwrite_path, mods_path)];
        mappings.extend(
            mapper
                .prefixed_mappings(&ctx.profile.mods)
                .into_iter()
                .filter(|mapping| {
                    mapping.is_directory
                        || mapping
                            .source
                            .extension()
                            .map(|ext| ext.eq_ignore_ascii_case("pak"))
                            .unwrap_or(false)
                }),
        );
        Ok(mappings)
    }
}

/// Persist the prefixed pak names for the current profile. The host compares
/// the returned old and new lists to decide whether the `~mods` cache must
/// be rebuilt before launch.
pub fn record_pak_order(
    profile_dir: &std::path::Path,
    mappings: &[Mapping],
) -> Result<ModlistUpdate> {
    let names: Vec<String> = mappings
        .iter()
        .filter(|mapping| !mapping.is_directory)
        .filter_map(|mapping| {
            mapping
                .destination
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .collect();
    ModlistFileManager::new(profile_dir, PAK_MODLIST_NAME).update(&names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ActiveMod, Profile};
    use std::fs;
    use std::path::PathBuf;

    fn make_mod(root: &std::path::Path, name: &str, pak: &str) -> ActiveMod {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(pak), b"pak").unwrap();
        ActiveMod::new(name, dir)
    }

    #[test]
    fn destinations_encode_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let profile = Profile {
            path: PathBuf::new(),
            mods: vec![
                make_mod(dir.path(), "A", "x.pak"),
                make_mod(dir.path(), "B", "y.pak"),
                make_mod(dir.path(), "C", "z.pak"),
            ],
        };
        let game_root = dir.path().join("game");
        let overwrite = dir.path().join("overwrite");
        let ctx = MappingContext {
            game_path: &game_root,
            documents_path: None,
            overwrite_path: &overwrite,
            profile: &profile,
        };

        let game = create().unwrap();
        let mappings = game.file_mapper().unwrap().mappings(&ctx).unwrap();

        // Overwrite first, unprefixed.
        assert_eq!(mappings[0].source, overwrite);
        assert!(mappings[0].create_target);

        let names: Vec<String> = mappings[1..]
            .iter()
            .map(|m| m.destination.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["0_x.pak", "1_y.pak", "2_z.pak"]);
    }

    #[test]
    fn pak_order_is_recorded_per_profile() {
        let dir = tempfile::tempdir().unwrap();
        let profile_dir = dir.path().join("profile");
        let profile = Profile {
            path: profile_dir.clone(),
            mods: vec![
                make_mod(dir.path(), "A", "x.pak"),
                make_mod(dir.path(), "B", "y.pak"),
            ],
        };
        let game_root = dir.path().join("game");
        let overwrite = dir.path().join("overwrite");
        let ctx = MappingContext {
            game_path: &game_root,
            documents_path: None,
            overwrite_path: &overwrite,
            profile: &profile,
        };

        let game = create().unwrap();
        let mappings = game.file_mapper().unwrap().mappings(&ctx).unwrap();

        let first = record_pak_order(&profile_dir, &mappings).unwrap();
        assert!(first.previous.is_empty());
        assert_eq!(first.current, ["0_x.pak", "1_y.pak"]);

        let second = record_pak_order(&profile_dir, &mappings).unwrap();
        assert_eq!(second.previous, second.current);
    }

    #[test]
    fn non_pak_files_are_not_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let mod_dir = dir.path().join("M");
        fs::create_dir_all(&mod_dir).unwrap();
        fs::write(mod_dir.join("real.pak"), b"pak").unwrap();
        fs::write(mod_dir.join("readme.txt"), b"text").unwrap();
        let profile = Profile {
            path: PathBuf::new(),
            mods: vec![ActiveMod::new("M", &mod_dir)],
        };
        let game_root = dir.path().join("game");
        let overwrite = dir.path().join("overwrite");
        let ctx = MappingContext {
            game_path: &game_root,
            documents_path: None,
            overwrite_path: &overwrite,
            profile: &profile,
        };

        let game = create().unwrap();
        let mappings = game.file_mapper().unwrap().mappings(&ctx).unwrap();
        assert_eq!(mappings.len(), 2);
        assert!(mappings[1].destination.ends_with("~mods/0_real.pak"));
    }
}
