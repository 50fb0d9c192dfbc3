use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// An opaque save-game record. The framework never parses save contents;
/// the name is derived from the file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveGame {
    pub path: PathBuf,
}

impl SaveGame {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Recursively collect `*.extension` files under `folder`, sorted by path.
/// A missing folder yields an empty list.
pub fn list_saves(folder: &Path, extension: &str) -> Vec<SaveGame> {
    let mut saves: Vec<SaveGame> = WalkDir::new(folder)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .map(|entry| SaveGame::new(entry.path()))
        .collect();
    saves.sort_by(|a, b| a.path.cmp(&b.path));
    saves
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_saves_recursively_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("slot1")).unwrap();
        fs::write(dir.path().join("quick.sav"), b"").unwrap();
        fs::write(dir.path().join("slot1/auto.SAV"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let saves = list_saves(dir.path(), "sav");
        let names: Vec<String> = saves.iter().map(SaveGame::name).collect();
        assert_eq!(names, ["quick", "auto"]);
    }

    #[test]
    fn missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_saves(&dir.path().join("nope"), "sav").is_empty());
    }
}
