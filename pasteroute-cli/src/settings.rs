use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use pasteroute_core::SupportedExtensions;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const CONFIG_DIR_ENV: &str = "PASTEROUTE_CONFIG_DIR";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// `settings.json` is expected to be tiny.
pub const MAX_SETTINGS_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub supported_extensions: SupportedExtensions,
    /// Root for materialized clipboard files. `None` means the system temp dir.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("metadata read failed: {0}")]
    Metadata(#[source] io::Error),
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("parse failed: {0}")]
    Parse(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SettingsSaveError {
    #[error("create dir failed: {0}")]
    CreateDir(#[source] io::Error),
    #[error("serialize failed: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("tmp write failed: {0}")]
    WriteTmp(#[source] io::Error),
    #[error("rename failed: {0}")]
    Rename(#[source] io::Error),
    #[error("save task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(override_dir);
    }

    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("APPDATA").map(PathBuf::from))
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pasteroute")
}

pub fn settings_path(dir: &Path) -> PathBuf {
    dir.join(SETTINGS_FILE_NAME)
}

pub fn parse_settings_json(data: &str) -> Result<Settings, serde_json::Error> {
    serde_json::from_str::<Settings>(data)
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings, SettingsLoadError> {
    let meta = fs::metadata(path).map_err(SettingsLoadError::Metadata)?;
    if meta.len() > MAX_SETTINGS_BYTES {
        return Err(SettingsLoadError::TooLarge {
            size: meta.len(),
            max: MAX_SETTINGS_BYTES,
        });
    }

    let data = fs::read_to_string(path).map_err(SettingsLoadError::Read)?;
    parse_settings_json(&data).map_err(SettingsLoadError::Parse)
}

/// Missing files yield defaults silently; unreadable ones are logged first.
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    match load_settings_from_path(path) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "settings unreadable; using defaults");
            Settings::default()
        }
    }
}

pub fn save_settings_to_path(path: &Path, settings: &Settings) -> Result<(), SettingsSaveError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(SettingsSaveError::CreateDir)?;
    }

    let tmp = path.with_extension("json.tmp");
    let payload = serde_json::to_string_pretty(settings).map_err(SettingsSaveError::Serialize)?;
    fs::write(&tmp, payload.as_bytes()).map_err(SettingsSaveError::WriteTmp)?;

    if path.exists() {
        let _ = fs::remove_file(path);
    }

    fs::rename(&tmp, path).map_err(SettingsSaveError::Rename)?;
    Ok(())
}

pub fn save_settings_with_retry(path: &Path, settings: &Settings) -> Result<(), SettingsSaveError> {
    const MAX_ATTEMPTS: u32 = 3;
    const BACKOFF_BASE_MS: u64 = 50;

    let mut attempt = 1;
    loop {
        match save_settings_to_path(path, settings) {
            Ok(()) => return Ok(()),
            Err(err) if attempt >= MAX_ATTEMPTS => return Err(err),
            Err(err) => {
                warn!(attempt, error = %err, "settings save failed; retrying");
                let backoff_ms = BACKOFF_BASE_MS.saturating_mul(1_u64 << (attempt - 1));
                std::thread::sleep(Duration::from_millis(backoff_ms));
                attempt += 1;
            }
        }
    }
}

/// Runs the retrying save on the blocking pool so its backoff sleeps never
/// stall a runtime worker.
pub async fn save_settings(path: &Path, settings: &Settings) -> Result<(), SettingsSaveError> {
    let path = path.to_path_buf();
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || save_settings_with_retry(&path, &settings))
        .await
        .map_err(SettingsSaveError::Task)?
}
