use std::path::Path;
use std::process::Command;

use crate::app::adb::locator::normalize_command_path;
use crate::app::adb::paths::expand_home;
use crate::app::config::ScrcpySettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrcpyAvailability {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
}

/// Resolves the mirroring tool: the configured path wins, then `PATH`, then the usual install
/// locations. Falls back to the bare name so a launch attempt still reports a useful error.
pub fn resolve_scrcpy_program(settings: &ScrcpySettings) -> String {
    let configured = normalize_command_path(&settings.command_path);
    if !configured.is_empty() {
        return expand_home(&configured).display().to_string();
    }
    if which::which("scrcpy").is_ok() {
        return "scrcpy".to_string();
    }
    common_install_paths()
        .into_iter()
        .map(expand_home)
        .find(|path| path.is_file())
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "scrcpy".to_string())
}

pub fn check_scrcpy_availability(settings: &ScrcpySettings) -> ScrcpyAvailability {
    let command_path = resolve_scrcpy_program(settings);
    match try_version(&command_path) {
        Some(output) => ScrcpyAvailability {
            available: true,
            version_output: output,
            command_path,
        },
        None => ScrcpyAvailability {
            available: false,
            version_output: String::new(),
            command_path,
        },
    }
}

pub fn build_scrcpy_args(settings: &ScrcpySettings) -> Vec<String> {
    let extra = settings.extra_args.trim();
    if extra.is_empty() {
        return Vec::new();
    }
    shlex::split(extra).unwrap_or_else(|| extra.split_whitespace().map(str::to_string).collect())
}

fn common_install_paths() -> Vec<&'static str> {
    if std::env::consts::OS == "macos" {
        vec![
            "/opt/homebrew/bin/scrcpy",
            "/usr/local/bin/scrcpy",
            "~/Applications/scrcpy.app/Contents/MacOS/scrcpy",
        ]
    } else {
        vec![
            "/usr/bin/scrcpy",
            "/usr/local/bin/scrcpy",
            "/snap/bin/scrcpy",
            "~/.local/bin/scrcpy",
            "/opt/scrcpy/scrcpy",
        ]
    }
}

fn try_version(command: &str) -> Option<String> {
    if command != "scrcpy" && !Path::new(command).exists() {
        return None;
    }
    let output = Command::new(command).arg("--version").output().ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
