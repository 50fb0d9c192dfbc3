use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::host::ActiveMod;

const LOG_STAMP: &[FormatItem<'_>] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// What the last successful deploy looked like. Order is part of the
/// fingerprint: engines that cache by order must rebuild even when the same
/// mods are merely rearranged.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
struct DeployState {
    deployed_mods: Vec<String>,
}

/// Hooks a game module registers against the host's launch events. Every
/// hook is idempotent; running one twice without a state change is a no-op.
pub struct LifecycleHooks {
    pub overwrite_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub state_path: PathBuf,
    pub cache_max_age: Duration,
}

impl LifecycleHooks {
    pub fn new(
        overwrite_dir: impl Into<PathBuf>,
        logs_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        state_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            overwrite_dir: overwrite_dir.into(),
            logs_dir: logs_dir.into(),
            cache_dir: cache_dir.into(),
            state_path: state_path.into(),
            cache_max_age: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }

    /// The active-mod names in priority order.
    pub fn mod_fingerprint(mods: &[ActiveMod]) -> Vec<String> {
        mods.iter()
            .filter(|m| m.enabled)
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn needs_redeploy(&self, mods: &[ActiveMod]) -> bool {
        self.load_state().deployed_mods != Self::mod_fingerprint(mods)
    }

    /// Before-run: rebuild caches when the active set or its order changed.
    /// A deploy failure propagates so the host aborts the launch.
    pub fn before_run(
        &self,
        mods: &[ActiveMod],
        deploy: impl FnOnce() -> Result<()>,
    ) -> Result<()> {
        if !self.needs_redeploy(mods) {
            debug!("active mods unchanged, skipping redeploy");
            return Ok(());
        }
        deploy().context("redeploy caches before launch")?;
        self.record_deploy(mods)
    }

    fn record_deploy(&self, mods: &[ActiveMod]) -> Result<()> {
        let state = DeployState {
            deployed_mods: Self::mod_fingerprint(mods),
        };
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create state dir {parent:?}"))?;
        }
        let raw = serde_json::to_string_pretty(&state).context("serialize deploy state")?;
        fs::write(&self.state_path, raw)
            .with_context(|| format!("write deploy state {:?}", self.state_path))?;
        Ok(())
    }

    fn load_state(&self) -> DeployState {
        let Ok(raw) = fs::read_to_string(&self.state_path) else {
            return DeployState::default();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    /// About-to-run: make sure every deployed cache file also exists in the
    /// overwrite area, so files the game regenerates land there instead of
    /// the shared game directory. Returns the number of files seeded.
    pub fn seed_overwrite(&self) -> Result<usize> {
        if !self.cache_dir.is_dir() {
            return Ok(0);
        }
        let mut seeded = 0usize;
        for entry in walkdir::WalkDir::new(&self.cache_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            let rel = entry
                .path()
                .strip_prefix(&self.cache_dir)
                .context("cache relative path")?;
            let target = self.overwrite_dir.join(rel);
            if target.exists() {
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create overwrite dir {parent:?}"))?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("seed overwrite file {target:?}"))?;
            seeded += 1;
        }
        if seeded > 0 {
            info!("seeded {seeded} files into the overwrite area");
        }
        Ok(seeded)
    }

    /// Snapshot generated files for post-run diffing. Existing snapshots
    /// are refreshed.
    pub fn snapshot_generated(&self, files: &[PathBuf]) -> Result<usize> {
        let snapshot_dir = self.overwrite_dir.join(".prerun");
        let mut taken = 0usize;
        for file in files {
            if !file.is_file() {
                continue;
            }
            let Some(name) = file.file_name() else {
                continue;
            };
            fs::create_dir_all(&snapshot_dir)
                .with_context(|| format!("create snapshot dir {snapshot_dir:?}"))?;
            fs::copy(file, snapshot_dir.join(name))
                .with_context(|| format!("snapshot generated file {file:?}"))?;
            taken += 1;
        }
        Ok(taken)
    }

    /// After-run: rotate logs out of the overwrite area, prune stale cache
    /// subfolders and drop directories left empty.
    pub fn after_run(&self) -> Result<()> {
        self.rotate_logs()?;
        self.prune_stale_caches()?;
        remove_empty_dirs(&self.overwrite_dir)?;
        Ok(())
    }

    fn rotate_logs(&self) -> Result<()> {
        let Ok(entries) = fs::read_dir(&self.overwrite_dir) else {
            return Ok(());
        };
        let stamp = OffsetDateTime::now_utc()
            .format(LOG_STAMP)
            .context("format log stamp")?;
        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if !path.is_file()
                || path
                    .extension()
                    .map(|ext| !ext.eq_ignore_ascii_case("log"))
                    .unwrap_or(true)
            {
                continue;
            }
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "game".to_string());
            fs::create_dir_all(&self.logs_dir)
                .with_context(|| format!("create logs dir {:?}", self.logs_dir))?;
            let rotated = self.logs_dir.join(format!("{stem}_{stamp}.log"));
            fs::rename(&path, &rotated)
                .with_context(|| format!("rotate log {path:?}"))?;
            info!("rotated {path:?} to {rotated:?}");
        }
        Ok(())
    }

    fn prune_stale_caches(&self) -> Result<()> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Ok(());
        };
        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|meta| meta.modified()) else {
                continue;
            };
            let age = modified.elapsed().unwrap_or_default();
            if age > self.cache_max_age {
                match fs::remove_dir_all(&path) {
                    Ok(()) => info!("pruned stale cache {path:?}"),
                    Err(err) => warn!("could not prune cache {path:?}: {err}"),
                }
            }
        }
        Ok(())
    }
}

/// Depth-first removal of empty directories under `root`, leaving `root`
/// itself in place.
fn remove_empty_dirs(root: &Path) -> Result<()> {
    let Ok(entries) = fs::read_dir(root) else {
        return Ok(());
    };
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        remove_empty_dirs(&path)?;
        if fs::read_dir(&path)
            .map(|mut dir| dir.next().is_none())
            .unwrap_or(false)
        {
            let _ = fs::remove_dir(&path);
        }
    }
    Ok(())
}
