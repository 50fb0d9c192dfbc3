use super::{ErrorSink, Hive, StoreContext, StoreEntries, StoreError, StoreKind};
use std::fs;
use std::path::{Path, PathBuf};

const STEAM_KEY: &str = "Software\\Valve\\Steam";

/// Locate installed Steam games: read the Steam installation from the
/// registry (falling back to the conventional Linux roots), parse the
/// library-folders index, then every `steamapps/*.acf` manifest.
pub fn find_games(ctx: &StoreContext, sink: &mut ErrorSink) -> StoreEntries {
    let mut games = StoreEntries::new();
    for root in steam_roots(ctx) {
        let mut libraries = parse_library_index(&root.join("steamapps").join("libraryfolders.vdf"), sink);
        libraries.push(root);
        for library in libraries {
            collect_manifests(&library, &mut games, sink);
        }
    }
    games
}

fn steam_roots(ctx: &StoreContext) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(exe) = ctx.registry.string_value(Hive::CurrentUser, STEAM_KEY, "SteamExe") {
        // Windows accepts forward slashes, so the value works as-is on
        // every platform.
        let exe = PathBuf::from(exe);
        if let Some(dir) = exe.parent() {
            roots.push(dir.to_path_buf());
        }
    }
    if let Some(home) = &ctx.home {
        for candidate in [home.join(".local/share/Steam"), home.join(".steam/steam")] {
            if candidate.join("steamapps").is_dir() {
                roots.push(candidate);
            }
        }
    }
    roots.dedup();
    roots
}

/// Library roots listed in `libraryfolders.vdf`. Handles both the legacy
/// `"1" "D:\\Games"` entries and the newer blocks carrying a `"path"` key.
fn parse_library_index(path: &Path, sink: &mut ErrorSink) -> Vec<PathBuf> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        // A Steam install without extra libraries has no index; not an error.
        Err(_) => return Vec::new(),
    };

    let mut folders = Vec::new();
    let mut saw_pair = false;
    for line in raw.lines() {
        let Some((key, value)) = parse_vdf_pair(line) else {
            continue;
        };
        saw_pair = true;
        let is_legacy_entry = key.chars().all(|c| c.is_ascii_digit()) && !key.is_empty();
        if key.eq_ignore_ascii_case("path") || is_legacy_entry {
            folders.push(PathBuf::from(value.replace("\\\\", "\\")));
        }
    }
    if !saw_pair {
        sink.push(StoreError::Parse {
            store: StoreKind::Steam,
            path: path.to_path_buf(),
            message: "no key-value pairs in library index".to_string(),
        });
    }
    folders
}

fn collect_manifests(library: &Path, games: &mut StoreEntries, sink: &mut ErrorSink) {
    let steamapps = library.join("steamapps");
    let entries = match fs::read_dir(&steamapps) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with("appmanifest") || !name.ends_with(".acf") {
            continue;
        }
        match parse_app_manifest(&path) {
            Some((appid, installdir)) => {
                games.insert(appid, steamapps.join("common").join(installdir));
            }
            None => sink.push(StoreError::Parse {
                store: StoreKind::Steam,
                path,
                message: "missing appid or installdir".to_string(),
            }),
        }
    }
}

fn parse_app_manifest(path: &Path) -> Option<(String, String)> {
    let raw = fs::read_to_string(path).ok()?;
    let mut appid = None;
    let mut installdir = None;
    for line in raw.lines() {
        let Some((key, value)) = parse_vdf_pair(line) else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "appid" if appid.is_none() => appid = Some(value.to_string()),
            "installdir" if installdir.is_none() => installdir = Some(value.to_string()),
            _ => {}
        }
        if appid.is_some() && installdir.is_some() {
            break;
        }
    }
    Some((appid?, installdir?))
}

/// A `"key" "value"` line from Valve's key-value format.
fn parse_vdf_pair(line: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = line.trim().split('"').collect();
    // "key"<ws>"value" splits into 5 parts with empty ends.
    if parts.len() >= 5 && !parts[1].is_empty() && parts[2].trim().is_empty() {
        Some((parts[1], parts[3]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::StaticRegistry;

    fn write_manifest(steamapps: &Path, appid: &str, installdir: &str) {
        fs::create_dir_all(steamapps).unwrap();
        fs::write(
            steamapps.join(format!("appmanifest_{appid}.acf")),
            format!(
                "\"AppState\"\n{{\n\t\"appid\"\t\t\"{appid}\"\n\t\"name\"\t\t\"x\"\n\t\"installdir\"\t\t\"{installdir}\"\n}}\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn finds_games_across_library_folders() {
        let dir = tempfile::tempdir().unwrap();
        let steam_root = dir.path().join("Steam");
        let library = dir.path().join("Library");
        write_manifest(&steam_root.join("steamapps"), "42", "Skyrim");
        write_manifest(&library.join("steamapps"), "7", "Oblivion");
        fs::write(
            steam_root.join("steamapps/libraryfolders.vdf"),
            format!(
                "\"libraryfolders\"\n{{\n\t\"0\"\n\t{{\n\t\t\"path\"\t\t\"{}\"\n\t}}\n}}\n",
                library.display()
            ),
        )
        .unwrap();

        let mut registry = StaticRegistry::default();
        registry.set_value(
            Hive::CurrentUser,
            STEAM_KEY,
            "SteamExe",
            &steam_root.join("steam.exe").to_string_lossy(),
        );
        let ctx = StoreContext {
            registry: Box::new(registry),
            ..StoreContext::empty()
        };

        let mut sink = ErrorSink::default();
        let games = find_games(&ctx, &mut sink);
        assert!(sink.is_empty());
        assert_eq!(
            games.get("42"),
            Some(&steam_root.join("steamapps/common/Skyrim"))
        );
        assert_eq!(
            games.get("7"),
            Some(&library.join("steamapps/common/Oblivion"))
        );
    }

    #[test]
    fn legacy_library_index_entries() {
        let dir = tempfile::tempdir().unwrap();
        let vdf = dir.path().join("libraryfolders.vdf");
        fs::write(
            &vdf,
            "\"LibraryFolders\"\n{\n\t\"TimeNextStatsReport\"\t\t\"0\"\n\t\"1\"\t\t\"D:\\\\Games\"\n}\n",
        )
        .unwrap();
        let mut sink = ErrorSink::default();
        let folders = parse_library_index(&vdf, &mut sink);
        assert_eq!(folders, vec![PathBuf::from("D:\\Games")]);
    }

    #[test]
    fn broken_manifest_does_not_poison_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let steam_root = dir.path().join("Steam");
        write_manifest(&steam_root.join("steamapps"), "42", "Skyrim");
        fs::write(
            steam_root.join("steamapps/appmanifest_9.acf"),
            "not a manifest at all",
        )
        .unwrap();

        let mut registry = StaticRegistry::default();
        registry.set_value(
            Hive::CurrentUser,
            STEAM_KEY,
            "SteamExe",
            &steam_root.join("steam.exe").to_string_lossy(),
        );
        let ctx = StoreContext {
            registry: Box::new(registry),
            ..StoreContext::empty()
        };

        let mut sink = ErrorSink::default();
        let games = find_games(&ctx, &mut sink);
        assert_eq!(games.len(), 1);
        assert_eq!(sink.errors().len(), 1);
    }

    #[test]
    fn missing_registry_key_yields_empty_map() {
        let mut sink = ErrorSink::default();
        let games = find_games(&StoreContext::empty(), &mut sink);
        assert!(games.is_empty());
        assert!(sink.is_empty());
    }
}
