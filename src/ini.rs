use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

/// Minimal INI document with case-sensitive option names.
///
/// Declarative game files rely on exact option casing (`GameName`, not
/// `gamename`), so keys are stored verbatim. Section names are looked up
/// case-insensitively, matching how the files are written in the wild.
#[derive(Debug, Clone, Default)]
pub struct IniFile {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl IniFile {
    /// Parse INI text. Options appearing before any section header land in
    /// an unnamed section reachable as `""`; EA Desktop's `user_*.ini` has
    /// no header at all.
    pub fn parse(text: &str) -> Self {
        let mut sections: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
        let mut current = String::new();
        for raw_line in text.lines() {
            let line = raw_line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                current = line[1..line.len() - 1].trim().to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }
            let Some(split) = line.find('=') else {
                continue;
            };
            let key = line[..split].trim().to_string();
            let value = line[split + 1..].trim().trim_matches('"').to_string();
            if key.is_empty() {
                continue;
            }
            sections.entry(current.clone()).or_default().insert(key, value);
        }
        Self { sections }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read ini {path:?}"))?;
        Ok(Self::parse(&text))
    }

    pub fn section(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.sections
            .iter()
            .find(|(section, _)| section.eq_ignore_ascii_case(name))
            .map(|(_, options)| options)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key).map(String::as_str)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }
}
