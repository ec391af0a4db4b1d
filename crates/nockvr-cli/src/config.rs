//! Settings file – reads/writes `~/.nockvr/config.toml` and watches it for
//! edits.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use nockvr_runtime::SettingsSource;
use nockvr_types::{NockError, NockSettings};
use tracing::{debug, info, warn};

/// Return the path to `~/.nockvr/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".nockvr").join("config.toml")
}

/// Load settings from `path`.  Returns `None` if the file does not exist.
///
/// Environment overrides are applied and the result is sanitized.
pub fn load_from(path: &Path) -> Result<Option<NockSettings>, NockError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        NockError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let mut settings: NockSettings = toml::from_str(&raw)
        .map_err(|e| NockError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut settings);
    Ok(Some(settings.sanitized()))
}

/// Apply `NOCKVR_*` environment variable overrides to `settings`.
///
/// | Variable | Field |
/// |---|---|
/// | `NOCKVR_LEFT_HAND_MODE` | `left_hand_mode` |
/// | `NOCKVR_OVERLAP_RADIUS` | `overlap_radius` |
/// | `NOCKVR_DEBUG` | `debug_print` |
pub fn apply_env_overrides(settings: &mut NockSettings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Same as [`apply_env_overrides`] with an injectable lookup.  Unparseable
/// values are ignored with a warning.
pub(crate) fn apply_overrides(settings: &mut NockSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("NOCKVR_LEFT_HAND_MODE") {
        match parse_flag(&v) {
            Some(flag) => settings.left_hand_mode = flag,
            None => warn!(value = %v, "NOCKVR_LEFT_HAND_MODE is not a boolean, ignored"),
        }
    }
    if let Some(v) = lookup("NOCKVR_OVERLAP_RADIUS") {
        match v.trim().parse::<f32>() {
            Ok(radius) => settings.overlap_radius = radius,
            Err(_) => warn!(value = %v, "NOCKVR_OVERLAP_RADIUS is not a number, ignored"),
        }
    }
    if let Some(v) = lookup("NOCKVR_DEBUG") {
        match parse_flag(&v) {
            Some(flag) => settings.debug_print = flag,
            None => warn!(value = %v, "NOCKVR_DEBUG is not a boolean, ignored"),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save settings to `path`, creating the parent directory if necessary.
pub fn save_to(settings: &NockSettings, path: &Path) -> Result<(), NockError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            NockError::Config(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let raw = toml::to_string_pretty(settings)
        .map_err(|e| NockError::Config(format!("failed to serialize settings: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| NockError::Config(format!("failed to write {}: {e}", path.display())))
}

// ─────────────────────────────────────────────────────────────────────────────
// Watcher
// ─────────────────────────────────────────────────────────────────────────────

/// Reloads the settings file when its modification time changes.
///
/// A missing, unreadable, or malformed file never replaces settings that
/// were loaded successfully before.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
    current: NockSettings,
}

impl ConfigWatcher {
    /// Load `path` once.  Falls back to defaults when it cannot be read.
    pub fn new(path: PathBuf) -> Self {
        let mut watcher = Self {
            modified: None,
            current: NockSettings::default(),
            path,
        };
        match watcher.load() {
            Some(settings) => {
                info!(path = %watcher.path.display(), "settings loaded");
                watcher.current = settings;
            }
            None => {
                let mut defaults = NockSettings::default();
                apply_env_overrides(&mut defaults);
                watcher.current = defaults.sanitized();
            }
        }
        watcher
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The most recently loaded settings.
    pub fn current(&self) -> &NockSettings {
        &self.current
    }

    fn mtime(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    fn load(&mut self) -> Option<NockSettings> {
        self.modified = self.mtime();
        match load_from(&self.path) {
            Ok(Some(settings)) => Some(settings),
            Ok(None) => {
                warn!(path = %self.path.display(), "settings file missing, keeping previous values");
                None
            }
            Err(e) => {
                warn!(error = %e, "settings reload failed, keeping previous values");
                None
            }
        }
    }
}

impl SettingsSource for ConfigWatcher {
    fn poll(&mut self) -> Option<NockSettings> {
        let mtime = self.mtime();
        if mtime.is_none() || mtime == self.modified {
            return None;
        }
        debug!(path = %self.path.display(), "settings file changed");
        self.reload()
    }

    fn reload(&mut self) -> Option<NockSettings> {
        let settings = self.load()?;
        self.current = settings.clone();
        Some(settings)
    }
}
