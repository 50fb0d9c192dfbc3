use super::{ErrorSink, StoreContext, StoreEntries, StoreError, StoreKind};
use crate::ini::IniFile;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::path::{Path, PathBuf};

/// Locate installed EA Desktop games. The launcher settings file
/// (`user_*.ini`, headerless) names the download directory; every game
/// below it carries an `__Installer/installerdata.xml` whose first
/// `contentIDs/contentID` is the store id.
pub fn find_games(ctx: &StoreContext, sink: &mut ErrorSink) -> StoreEntries {
    let mut games = StoreEntries::new();
    let Some(local_app_data) = &ctx.local_app_data else {
        return games;
    };
    let settings_dir = local_app_data.join("Electronic Arts").join("EA Desktop");
    if !settings_dir.is_dir() {
        return games;
    }

    let install_path = match user_ini(&settings_dir) {
        Some(ini_path) => match fs::read_to_string(&ini_path) {
            Ok(raw) => IniFile::parse(&raw)
                .get("", "user.downloadinplacedir")
                .map(PathBuf::from),
            Err(err) => {
                sink.push(StoreError::Io {
                    store: StoreKind::EaDesktop,
                    path: ini_path,
                    message: err.to_string(),
                });
                None
            }
        },
        None => None,
    };
    let install_path = install_path
        .or_else(|| ctx.program_w6432.as_ref().map(|pw| pw.join("EA Games")));
    let Some(install_path) = install_path else {
        return games;
    };

    let entries = match fs::read_dir(&install_path) {
        Ok(entries) => entries,
        Err(_) => return games,
    };
    for entry in entries.flatten() {
        let game_dir = entry.path();
        if !game_dir.is_dir() {
            continue;
        }
        let installer = game_dir.join("__Installer").join("installerdata.xml");
        if !installer.is_file() {
            continue;
        }
        match fs::read_to_string(&installer) {
            Ok(xml) => match first_content_id(&xml) {
                Some(content_id) => {
                    games.insert(content_id, game_dir);
                }
                None => sink.push(StoreError::Parse {
                    store: StoreKind::EaDesktop,
                    path: installer,
                    message: "no contentIDs/contentID element".to_string(),
                }),
            },
            Err(err) => sink.push(StoreError::Io {
                store: StoreKind::EaDesktop,
                path: installer,
                message: err.to_string(),
            }),
        }
    }
    games
}

/// First `user_*.ini` in the settings directory, in name order so repeated
/// scans pick the same file.
fn user_ini(settings_dir: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(settings_dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("user_") && n.ends_with(".ini"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Text of the first `contentID` element inside a `contentIDs` block,
/// wherever that block sits in the document.
fn first_content_id(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut inside_content_ids = false;
    let mut inside_content_id = false;
    loop {
        match reader.read_event().ok()? {
            Event::Start(tag) => match tag.name().as_ref() {
                b"contentIDs" => inside_content_ids = true,
                b"contentID" if inside_content_ids => inside_content_id = true,
                _ => {}
            },
            Event::End(tag) => match tag.name().as_ref() {
                b"contentIDs" => inside_content_ids = false,
                b"contentID" => inside_content_id = false,
                _ => {}
            },
            Event::Text(text) if inside_content_id => {
                let value = text.unescape().ok()?.trim().to_string();
                if !value.is_empty() {
                    return Some(value);
                }
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}
