use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;

pub const DEFAULT_DEVICE_ROOT: &str = "/sdcard/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdbSettings {
    pub command_path: String,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrcpySettings {
    /// Empty means "discover on PATH and the usual install locations".
    pub command_path: String,
    pub extra_args: String,
}

impl Default for ScrcpySettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            extra_args: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandSettings {
    pub timeout_secs: u64,
    pub drain_interval_ms: u64,
    pub progress_interval_ms: u64,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            drain_interval_ms: 100,
            progress_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathSettings {
    pub device_root: String,
    /// Empty means the desktop directory of the current user.
    pub default_local_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            device_root: DEFAULT_DEVICE_ROOT.to_string(),
            default_local_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub scrcpy: ScrcpySettings,
    #[serde(default)]
    pub command: CommandSettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("ADB_PANEL_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".adb_panel_config.json")
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(validate_config(AppConfig::default()));
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn resolve_default_local_dir(configured: &str) -> PathBuf {
    let trimmed = configured.trim();
    if !trimmed.is_empty() {
        return PathBuf::from(trimmed);
    }
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    if !(5..=3600).contains(&config.command.timeout_secs) {
        config.command.timeout_secs = DEFAULT_TIMEOUT_SECS;
    }
    if config.command.drain_interval_ms < 10 || config.command.drain_interval_ms > 5000 {
        config.command.drain_interval_ms = 100;
    }
    if config.command.progress_interval_ms < 100 {
        config.command.progress_interval_ms = 1000;
    }
    let root = config.paths.device_root.trim();
    if !root.starts_with('/') || root == "/" {
        config.paths.device_root = DEFAULT_DEVICE_ROOT.to_string();
    } else if !root.ends_with('/') {
        config.paths.device_root = format!("{root}/");
    } else {
        config.paths.device_root = root.to_string();
    }
    if config.logging.log_level.trim().is_empty() {
        config.logging.log_level = "info".to_string();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from_path(&dir.path().join("absent.json"), "trace").expect("load");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.command.timeout_secs, 300);
        assert_eq!(config.paths.device_root, "/sdcard/");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "adb": { "command_path": "/opt/platform-tools/adb" }, "command": { "timeout_secs": 60, "drain_interval_ms": 100, "progress_interval_ms": 1000 } }"#,
        )
        .expect("write");
        let config = load_config_from_path(&path, "trace").expect("load");
        assert_eq!(config.adb.command_path, "/opt/platform-tools/adb");
        assert_eq!(config.command.timeout_secs, 60);
        assert_eq!(config.paths, PathSettings::default());
    }

    #[test]
    fn malformed_file_is_a_system_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("write");
        let err = load_config_from_path(&path, "trace-cfg").unwrap_err();
        assert_eq!(err.code, "ERR_SYSTEM");
        assert_eq!(err.trace_id, "trace-cfg");
    }

    #[test]
    fn clamps_invalid_values() {
        let mut config = AppConfig::default();
        config.command.timeout_secs = 0;
        config.command.drain_interval_ms = 1;
        config.command.progress_interval_ms = 5;
        config.paths.device_root = "/data/local/tmp".to_string();
        let validated = validate_config(config);
        assert_eq!(validated.command.timeout_secs, 300);
        assert_eq!(validated.command.drain_interval_ms, 100);
        assert_eq!(validated.command.progress_interval_ms, 1000);
        assert_eq!(validated.paths.device_root, "/data/local/tmp/");
    }

    #[test]
    fn rejects_filesystem_root_as_device_root() {
        let mut config = AppConfig::default();
        config.paths.device_root = "/".to_string();
        assert_eq!(validate_config(config).paths.device_root, "/sdcard/");
    }

    #[test]
    fn explicit_local_dir_wins() {
        assert_eq!(
            resolve_default_local_dir(" /tmp/out "),
            PathBuf::from("/tmp/out")
        );
    }
}
