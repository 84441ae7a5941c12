use std::path::{Path, PathBuf};

/// Device-side paths must live under `root` (e.g. `/sdcard/`).
pub fn validate_device_path(path: &str, root: &str) -> Result<(), String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err("device_path is required".to_string());
    }
    if !trimmed.starts_with(root) {
        return Err(format!("Please enter a valid device path (starting with {root})"));
    }
    if trimmed.contains('\0') {
        return Err("device_path contains invalid characters".to_string());
    }
    for segment in trimmed.split('/') {
        if segment == ".." {
            return Err("device_path must not contain '..' segments".to_string());
        }
    }
    Ok(())
}

pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Trailing separator so the operator can type a file name straight after it.
pub fn with_trailing_separator(dir: &Path) -> String {
    let mut value = dir.display().to_string();
    if !value.ends_with(std::path::MAIN_SEPARATOR) {
        value.push(std::path::MAIN_SEPARATOR);
    }
    value
}
