pub mod ea_desktop;
pub mod epic;
pub mod gog;
pub mod origin;
pub mod steam;

use crate::paths;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Map from a store-specific game id to the install path.
pub type StoreEntries = IndexMap<String, PathBuf>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Steam,
    Gog,
    Epic,
    Origin,
    EaDesktop,
}

impl StoreKind {
    pub const ALL: [StoreKind; 5] = [
        StoreKind::Steam,
        StoreKind::Gog,
        StoreKind::Epic,
        StoreKind::Origin,
        StoreKind::EaDesktop,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StoreKind::Steam => "Steam",
            StoreKind::Gog => "GOG",
            StoreKind::Epic => "Epic",
            StoreKind::Origin => "Origin",
            StoreKind::EaDesktop => "EA Desktop",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-unit failure inside a store scan. Finders never abort on these; they
/// are collected so the loader can present one combined report.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{store}: cannot parse {path}: {message}")]
    Parse {
        store: StoreKind,
        path: PathBuf,
        message: String,
    },
    #[error("{store}: cannot read {path}: {message}")]
    Io {
        store: StoreKind,
        path: PathBuf,
        message: String,
    },
}

/// Collects per-unit store errors across a scan.
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Vec<StoreError>,
}

impl ErrorSink {
    pub fn push(&mut self, error: StoreError) {
        log::warn!("{error}");
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[StoreError] {
        &self.errors
    }

    pub fn take(&mut self) -> Vec<StoreError> {
        std::mem::take(&mut self.errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    CurrentUser,
    LocalMachine,
}

/// Read-only view of the system registry.
///
/// Finders never touch the registry directly; the host (or a test) supplies
/// the implementation, so scans behave identically on every platform.
pub trait Registry: Send + Sync {
    fn string_value(&self, hive: Hive, key: &str, name: &str) -> Option<String>;
    fn subkeys(&self, hive: Hive, key: &str) -> Vec<String>;
}

/// Registry backed by in-memory maps. Used in tests and by embedders on
/// platforms without a registry.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    values: HashMap<(Hive, String, String), String>,
    keys: HashMap<(Hive, String), Vec<String>>,
}

impl StaticRegistry {
    pub fn set_value(&mut self, hive: Hive, key: &str, name: &str, value: &str) {
        self.values
            .insert((hive, key.to_string(), name.to_string()), value.to_string());
    }

    pub fn set_subkeys(&mut self, hive: Hive, key: &str, subkeys: &[&str]) {
        self.keys.insert(
            (hive, key.to_string()),
            subkeys.iter().map(|s| s.to_string()).collect(),
        );
    }
}

impl Registry for StaticRegistry {
    fn string_value(&self, hive: Hive, key: &str, name: &str) -> Option<String> {
        self.values
            .get(&(hive, key.to_string(), name.to_string()))
            .cloned()
    }

    fn subkeys(&self, hive: Hive, key: &str) -> Vec<String> {
        self.keys
            .get(&(hive, key.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// The live system registry. On non-Windows platforms every lookup misses,
/// which the finders treat like any absent key.
#[derive(Debug, Default)]
pub struct SystemRegistry;

#[cfg(windows)]
impl Registry for SystemRegistry {
    fn string_value(&self, hive: Hive, key: &str, name: &str) -> Option<String> {
        let root = match hive {
            Hive::CurrentUser => winreg::RegKey::predef(winreg::enums::HKEY_CURRENT_USER),
            Hive::LocalMachine => winreg::RegKey::predef(winreg::enums::HKEY_LOCAL_MACHINE),
        };
        let key = root.open_subkey(key).ok()?;
        key.get_value::<String, _>(name).ok()
    }

    fn subkeys(&self, hive: Hive, key: &str) -> Vec<String> {
        let root = match hive {
            Hive::CurrentUser => winreg::RegKey::predef(winreg::enums::HKEY_CURRENT_USER),
            Hive::LocalMachine => winreg::RegKey::predef(winreg::enums::HKEY_LOCAL_MACHINE),
        };
        match root.open_subkey(key) {
            Ok(key) => key.enum_keys().filter_map(|k| k.ok()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(not(windows))]
impl Registry for SystemRegistry {
    fn string_value(&self, _hive: Hive, _key: &str, _name: &str) -> Option<String> {
        None
    }

    fn subkeys(&self, _hive: Hive, _key: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Filesystem and registry roots a store scan reads from. Everything is
/// injectable so finders are total functions of their inputs.
pub struct StoreContext {
    pub registry: Box<dyn Registry>,
    pub home: Option<PathBuf>,
    pub config_home: Option<PathBuf>,
    pub program_data: Option<PathBuf>,
    pub local_app_data: Option<PathBuf>,
    pub program_w6432: Option<PathBuf>,
}

impl StoreContext {
    pub fn system() -> Self {
        let home = paths::home_dir();
        let config_home = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".config")));
        Self {
            registry: Box::new(SystemRegistry),
            home,
            config_home,
            program_data: std::env::var_os("PROGRAMDATA").map(PathBuf::from),
            local_app_data: std::env::var_os("LOCALAPPDATA").map(PathBuf::from),
            program_w6432: std::env::var_os("ProgramW6432").map(PathBuf::from),
        }
    }

    /// A context that sees nothing: no registry, no conventional roots.
    /// Scans against it are total and come back empty.
    pub fn empty() -> Self {
        Self {
            registry: Box::new(StaticRegistry::default()),
            home: None,
            config_home: None,
            program_data: None,
            local_app_data: None,
            program_w6432: None,
        }
    }
}

/// All store-entry maps, built once at startup and read-only until an
/// explicit re-scan. Game modules borrow this to answer `detectGame`.
#[derive(Debug, Default)]
pub struct Discovery {
    entries: HashMap<StoreKind, StoreEntries>,
}

impl Discovery {
    /// Scan every store. Per-unit failures land in `sink`; a store that is
    /// simply not installed contributes an empty map.
    pub fn scan(ctx: &StoreContext, sink: &mut ErrorSink) -> Self {
        let mut entries = HashMap::new();
        entries.insert(StoreKind::Steam, steam::find_games(ctx, sink));
        entries.insert(StoreKind::Gog, gog::find_games(ctx, sink));
        entries.insert(StoreKind::Epic, epic::find_games(ctx, sink));
        entries.insert(StoreKind::Origin, origin::find_games(ctx, sink));
        entries.insert(StoreKind::EaDesktop, ea_desktop::find_games(ctx, sink));
        for (kind, map) in &entries {
            log::info!("{kind}: found {} installed game(s)", map.len());
        }
        Self { entries }
    }

    pub fn store(&self, kind: StoreKind) -> &StoreEntries {
        static EMPTY: std::sync::OnceLock<StoreEntries> = std::sync::OnceLock::new();
        self.entries
            .get(&kind)
            .unwrap_or_else(|| EMPTY.get_or_init(StoreEntries::new))
    }

    /// Install path for a store-specific id, if that game is installed.
    pub fn install_path(&self, kind: StoreKind, id: &str) -> Option<&PathBuf> {
        self.entries.get(&kind)?.get(id)
    }

    /// Store id whose recorded install path equals `path`, if any.
    pub fn id_for_path(&self, kind: StoreKind, path: &std::path::Path) -> Option<&str> {
        self.entries
            .get(&kind)?
            .iter()
            .find(|(_, install)| paths_equal(install, path))
            .map(|(id, _)| id.as_str())
    }

    /// Build a discovery from pre-computed maps. Hosts with their own store
    /// scanning (and tests) inject entries this way.
    pub fn from_entries(entries: Vec<(StoreKind, StoreEntries)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

fn paths_equal(a: &std::path::Path, b: &std::path::Path) -> bool {
    let normalize = |p: &std::path::Path| {
        p.to_string_lossy()
            .replace('\\', "/")
            .trim_end_matches('/')
            .to_lowercase()
    };
    normalize(a) == normalize(b)
}
