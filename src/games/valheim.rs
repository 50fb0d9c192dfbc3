use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info};
use regex::Regex;

use crate::binding::GameAttributes;
use crate::checker::BasicModDataChecker;
use crate::features::{BasicLocalSavegames, GameFeatures, LocalSavegames};
use crate::game::GameModule;
use crate::patterns::GlobPatterns;

const SAVES_DIR: &str = "%USERPROFILE%/AppData/LocalLow/IronGate/Valheim";

fn checker_patterns() -> GlobPatterns {
    GlobPatterns {
        unfold: vec!["BepInExPack_Valheim".into()],
        valid: vec![
            "meta.ini".into(),
            "BepInEx".into(),
            "doorstop_libs".into(),
            "unstripped_corlib".into(),
            "doorstop_config.ini".into(),
            "start_game_bepinex.sh".into(),
            "start_server_bepinex.sh".into(),
            "winhttp.dll".into(),
            "InSlimVML".into(),
            "valheim_Data".into(),
            "inslimvml.ini".into(),
            "unstripped_managed".into(),
            "AdvancedBuilder".into(),
        ],
        delete: vec![
            "*.txt".into(),
            "*.md".into(),
            "icon.png".into(),
            "license".into(),
            "manifest.json".into(),
        ],
        move_map: IndexMap::from([
            ("*_VML.dll".to_string(), "InSlimVML/Mods/".to_string()),
            ("plugins".to_string(), "BepInEx/".to_string()),
            ("*.dll".to_string(), "BepInEx/plugins/".to_string()),
            ("config".to_string(), "BepInEx/".to_string()),
            ("*.cfg".to_string(), "BepInEx/config/".to_string()),
            ("CustomTextures".to_string(), "BepInEx/plugins/".to_string()),
            ("*.png".to_string(), "BepInEx/plugins/CustomTextures/".to_string()),
            ("Builds".to_string(), "AdvancedBuilder/".to_string()),
            ("*.vbuild".to_string(), "AdvancedBuilder/Builds/".to_string()),
            ("*.assets".to_string(), "valheim_Data/".to_string()),
        ]),
        ..Default::default()
    }
}

pub fn create() -> Result<GameModule> {
    let attrs = GameAttributes {
        name: Some("Valheim Support Plugin".into()),
        author: Some("Zash".into()),
        version: Some("1.1.1".into()),
        game_name: Some("Valheim".into()),
        game_short_name: Some("valheim".into()),
        nexus_game_id: Some(3667.into()),
        binary_name: Some("valheim.exe".into()),
        data_directory: Some("".into()),
        saves_directory: Some(SAVES_DIR.into()),
        steam_ids: Some("892970,896660,1223920".into()),
        ..Default::default()
    };

    let mut module = GameModule::new("valheim", attrs)?;
    let features = GameFeatures {
        mod_data_checker: Some(Box::new(BasicModDataChecker::new(checker_patterns())?)),
        local_savegames: module
            .saves_directory()
            .map(|dir| Box::new(BasicLocalSavegames::new(dir)) as Box<dyn LocalSavegames>),
        ..Default::default()
    };
    module = module
        .with_features(features)
        .with_forced_libraries(vec!["winhttp.dll".to_string()]);
    Ok(module)
}

/// Moves files the game dropped into the overwrite area back into the mod
/// they belong to, matched by name. BepInEx writes plugin configs next to
/// the game, so after a run they pile up in overwrite.
pub struct OverwriteSync {
    pub overwrite_dir: PathBuf,
    pub mods_dir: PathBuf,
    matcher: PartialMatch,
}

impl OverwriteSync {
    pub fn new(overwrite_dir: impl Into<PathBuf>, mods_dir: impl Into<PathBuf>) -> Self {
        Self {
            overwrite_dir: overwrite_dir.into(),
            mods_dir: mods_dir.into(),
            matcher: PartialMatch::new(),
        }
    }

    /// Walk `BepInEx/config` and `BepInEx/plugins` in the overwrite area
    /// and move each file into the unique best-matching mod. Ambiguous or
    /// unmatched files stay put. Returns the number of files moved.
    pub fn sync(&self) -> Result<usize> {
        let mod_names = self.mod_names()?;
        let mut moved = 0usize;
        for subdir in ["BepInEx/config", "BepInEx/plugins"] {
            let dir = self.overwrite_dir.join(subdir);
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.filter_map(|entry| entry.ok()) {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy().to_string();
                let Some(mod_name) = self.matcher.best_match(&file_name, &mod_names) else {
                    debug!("overwrite sync: no unique mod for {file_name}");
                    continue;
                };
                let target = self.mods_dir.join(&mod_name).join(subdir).join(&file_name);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("create mod dir {parent:?}"))?;
                }
                fs::rename(&path, &target)
                    .with_context(|| format!("move {path:?} into mod {mod_name}"))?;
                info!("overwrite sync: moved {file_name} into {mod_name}");
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn mod_names(&self) -> Result<Vec<String>> {
        let Ok(entries) = fs::read_dir(&self.mods_dir) else {
            return Ok(Vec::new());
        };
        Ok(entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect())
    }
}

/// Word-level matching between a file name and mod names: camel-case words
/// of at least three letters, compared case-insensitively.
struct PartialMatch {
    word: Regex,
    exclude: Vec<&'static str>,
}

impl PartialMatch {
    fn new() -> Self {
        Self {
            word: Regex::new(r"[A-Z]?[a-z]+").unwrap(),
            exclude: vec!["the", "mod", "plugin", "valheim", "config"],
        }
    }

    fn words(&self, text: &str) -> Vec<String> {
        self.word
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .filter(|w| w.len() >= 3 && !self.exclude.contains(&w.as_str()))
            .collect()
    }

    /// The single mod sharing the most words with `file_name`; `None` when
    /// nothing matches or the best score is tied.
    fn best_match(&self, file_name: &str, mod_names: &[String]) -> Option<String> {
        let file_words = self.words(file_name);
        if file_words.is_empty() {
            return None;
        }
        let mut scored: Vec<(usize, &String)> = mod_names
            .iter()
            .map(|name| {
                let name_lower = name.to_lowercase();
                let score = file_words
                    .iter()
                    .filter(|word| name_lower.contains(word.as_str()))
                    .count();
                (score, name)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        match scored.as_slice() {
            [] => None,
            [only] => Some(only.1.clone()),
            [first, second, ..] if first.0 > second.0 => Some(first.1.clone()),
            _ => None,
        }
    }
}
