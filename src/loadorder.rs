use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::warn;

/// One plugin in the host's priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    pub name: String,
    pub active: bool,
}

impl PluginEntry {
    pub fn new(name: impl Into<String>, active: bool) -> Self {
        Self {
            name: name.into(),
            active,
        }
    }
}

/// Which plugins a write includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFilter {
    /// The enable-list: only plugins the user switched on.
    ActiveOnly,
    /// The full load order.
    All,
}

/// A profile's load-order file for one game.
pub struct LoadOrderFile {
    pub path: PathBuf,
    /// Plugins the game always loads, seeded ahead of everything on read.
    pub primary_plugins: Vec<String>,
    /// Comment line written at the top of the file.
    pub header: String,
}

impl LoadOrderFile {
    pub fn new(path: impl Into<PathBuf>, primary_plugins: Vec<String>) -> Self {
        Self {
            path: path.into(),
            primary_plugins,
            header: "# This file was automatically generated by Mod Organizer.".to_string(),
        }
    }

    /// Read the plugin order. The result starts with the primary plugins
    /// (deduplicated case-insensitively) and appends each non-comment line
    /// not already seen. A missing file yields just the primaries. The
    /// file's leading comment line is kept and written back on the next
    /// [`write`](Self::write).
    pub fn read(&mut self) -> Result<Vec<String>> {
        let mut order: Vec<String> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        let mut push = |name: &str, order: &mut Vec<String>| {
            let folded = name.to_lowercase();
            if !seen.contains(&folded) {
                seen.push(folded);
                order.push(name.to_string());
            }
        };

        for primary in &self.primary_plugins {
            push(primary, &mut order);
        }

        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return Ok(order),
        };
        let mut header_seen = false;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                if !header_seen {
                    self.header = line.to_string();
                    header_seen = true;
                }
                continue;
            }
            push(line, &mut order);
        }
        Ok(order)
    }

    /// Write the filtered plugin list in priority order. Returns the number
    /// of names skipped because their text was already corrupted. An empty
    /// selection is refused; writing it would wipe the user's order.
    pub fn write(&self, plugins: &[PluginEntry], filter: WriteFilter) -> Result<usize> {
        let selected: Vec<&PluginEntry> = plugins
            .iter()
            .filter(|plugin| match filter {
                WriteFilter::ActiveOnly => plugin.active,
                WriteFilter::All => true,
            })
            .collect();
        if selected.is_empty() {
            bail!("refusing to write empty load order to {:?}", self.path);
        }

        let mut skipped = 0usize;
        let mut text = String::new();
        text.push_str(&self.header);
        text.push('\n');
        for plugin in selected {
            if plugin.name.contains(char::REPLACEMENT_CHARACTER) {
                warn!("plugin name not encodable, skipping: {}", plugin.name);
                skipped += 1;
                continue;
            }
            text.push_str(&plugin.name);
            text.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create load order dir {parent:?}"))?;
        }
        fs::write(&self.path, text)
            .with_context(|| format!("write load order {:?}", self.path))?;
        Ok(skipped)
    }
}
