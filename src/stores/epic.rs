use super::{ErrorSink, Hive, StoreContext, StoreEntries, StoreError, StoreKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const EPIC_KEY: &str = "Software\\Wow6432Node\\Epic Games\\EpicGamesLauncher";

#[derive(Debug, Deserialize)]
struct ItemManifest {
    #[serde(rename = "AppName")]
    app_name: String,
    #[serde(rename = "InstallLocation")]
    install_location: String,
}

#[derive(Debug, Deserialize)]
struct InstalledGame {
    app_name: String,
    install_path: String,
}

/// Locate Epic games from the launcher's `.item` manifests, then merge the
/// installs recorded by the Legendary and Heroic launchers. Later sources
/// win on app-name collision.
pub fn find_games(ctx: &StoreContext, sink: &mut ErrorSink) -> StoreEntries {
    let mut games = StoreEntries::new();
    collect_epic_manifests(ctx, &mut games, sink);
    if let Some(config_home) = &ctx.config_home {
        collect_installed_json(&config_home.join("legendary/installed.json"), &mut games, sink);
        collect_installed_json(
            &config_home.join("heroic/legendaryConfig/legendary/installed.json"),
            &mut games,
            sink,
        );
    }
    games
}

fn collect_epic_manifests(ctx: &StoreContext, games: &mut StoreEntries, sink: &mut ErrorSink) {
    let data_path = ctx
        .registry
        .string_value(Hive::LocalMachine, EPIC_KEY, "AppDataPath")
        .map(PathBuf::from)
        .or_else(|| {
            ctx.program_data
                .as_ref()
                .map(|pd| pd.join("Epic/EpicGamesLauncher/Data"))
        });
    let Some(data_path) = data_path else {
        return;
    };
    let manifests = data_path.join("Manifests");
    let entries = match fs::read_dir(&manifests) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("item") {
            continue;
        }
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<ItemManifest>(&raw).map_err(|e| e.to_string()));
        match parsed {
            Ok(manifest) => {
                games.insert(manifest.app_name, PathBuf::from(manifest.install_location));
            }
            Err(message) => sink.push(StoreError::Parse {
                store: StoreKind::Epic,
                path,
                message,
            }),
        }
    }
}

fn collect_installed_json(path: &Path, games: &mut StoreEntries, sink: &mut ErrorSink) {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        // Launcher not present; nothing to report.
        Err(_) => return,
    };
    match serde_json::from_str::<HashMap<String, InstalledGame>>(&raw) {
        Ok(installed) => {
            let mut entries: Vec<InstalledGame> = installed.into_values().collect();
            entries.sort_by(|a, b| a.app_name.cmp(&b.app_name));
            for game in entries {
                games.insert(game.app_name, PathBuf::from(game.install_path));
            }
        }
        Err(err) => sink.push(StoreError::Parse {
            store: StoreKind::Epic,
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}
