use super::{ErrorSink, StoreContext, StoreEntries, StoreError, StoreKind};
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Locate installed Origin games from the `.mfst` manifests under
/// `%PROGRAMDATA%/Origin/LocalContent`. Each manifest is a URL-encoded
/// query; the `id` and `dipinstallpath` parameters carry what we need.
pub fn find_games(ctx: &StoreContext, sink: &mut ErrorSink) -> StoreEntries {
    let mut games = StoreEntries::new();
    let Some(program_data) = &ctx.program_data else {
        return games;
    };
    let local_content = program_data.join("Origin").join("LocalContent");
    if !local_content.is_dir() {
        return games;
    }

    for entry in WalkDir::new(&local_content)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !name.ends_with(".mfst") || name.contains("@steam") {
            continue;
        }
        let raw = match fs::read_to_string(entry.path()) {
            Ok(raw) => raw,
            Err(err) => {
                sink.push(StoreError::Io {
                    store: StoreKind::Origin,
                    path: entry.path().to_path_buf(),
                    message: err.to_string(),
                });
                continue;
            }
        };
        let query = parse_query(&raw);
        let ids = query.iter().filter(|(k, _)| k == "id");
        for (_, id) in ids {
            for (key, path) in &query {
                if key == "dipinstallpath" {
                    games.insert(id.clone(), PathBuf::from(path.clone()));
                }
            }
        }
    }
    games
}

/// Split a URL-encoded query into decoded key-value pairs. The manifest may
/// carry a full URL; only the part after `?` matters then.
fn parse_query(raw: &str) -> Vec<(String, String)> {
    let query = match raw.find('?') {
        Some(index) => &raw[index + 1..],
        None => raw,
    };
    query
        .trim()
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((percent_decode(key).to_lowercase(), percent_decode(value)))
        })
        .collect()
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3);
                match hex.and_then(|h| u8::from_str_radix(std::str::from_utf8(h).ok()?, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
