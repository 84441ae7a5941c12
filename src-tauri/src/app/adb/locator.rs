use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::adb::runner::run_command_with_timeout;
use crate::app::models::AdbInfo;

pub const ADB_MISSING_MESSAGE: &str = "ADB not found. Please ensure Android SDK platform-tools installed and `adb` is on PATH.\nInstall instructions: https://developer.android.com/studio/command-line/adb";

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|candidate| candidate.strip_suffix('"'))
    {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|candidate| candidate.strip_suffix('\''))
    {
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

pub fn resolve_adb_program(config_command_path: &str) -> String {
    let normalized = normalize_command_path(config_command_path);
    if normalized.is_empty() {
        "adb".to_string()
    } else {
        normalized
    }
}

pub fn validate_adb_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("ADB command is empty".to_string());
    }
    let path = Path::new(program);
    if path.components().count() == 1 && !path.is_absolute() {
        return match which::which(program) {
            Ok(_) => Ok(()),
            Err(_) => Err(format!("`{program}` was not found on PATH")),
        };
    }
    if path.is_dir() {
        return Err("ADB path must point to an executable file".to_string());
    }
    if !path.exists() {
        return Err("ADB executable not found at the configured path".to_string());
    }
    Ok(())
}

/// Presence probe followed by a version probe. Both must pass for the tool to be usable.
pub fn probe_adb(program: &str, trace_id: &str) -> AdbInfo {
    if let Err(message) = validate_adb_program(program) {
        warn!(trace_id = %trace_id, program = %program, error = %message, "adb presence probe failed");
        return AdbInfo {
            available: false,
            version_output: String::new(),
            command_path: program.to_string(),
            error: Some(message),
        };
    }

    let args = vec!["--version".to_string()];
    match run_command_with_timeout(program, &args, Duration::from_secs(5), trace_id) {
        Ok(output) if output.exit_code == Some(0) => {
            let version_output = output.stdout.trim().to_string();
            info!(trace_id = %trace_id, program = %program, "adb available");
            AdbInfo {
                available: true,
                version_output,
                command_path: program.to_string(),
                error: None,
            }
        }
        Ok(output) => {
            let message = format!(
                "adb --version exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            );
            warn!(trace_id = %trace_id, error = %message, "adb version probe failed");
            AdbInfo {
                available: false,
                version_output: output.stdout.trim().to_string(),
                command_path: program.to_string(),
                error: Some(message),
            }
        }
        Err(err) => {
            warn!(trace_id = %trace_id, error = %err.error, "adb version probe failed");
            AdbInfo {
                available: false,
                version_output: String::new(),
                command_path: program.to_string(),
                error: Some(err.error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_wrapping_double_quotes() {
        assert_eq!(
            normalize_command_path("  \"/opt/android/platform-tools/adb\"  "),
            "/opt/android/platform-tools/adb"
        );
    }

    #[test]
    fn strips_wrapping_single_quotes() {
        assert_eq!(
            normalize_command_path("  '/opt/android/platform-tools/adb'  "),
            "/opt/android/platform-tools/adb"
        );
    }

    #[test]
    fn resolves_empty_to_default_adb() {
        assert_eq!(resolve_adb_program(""), "adb");
        assert_eq!(resolve_adb_program("   "), "adb");
    }

    #[test]
    fn validates_nonexistent_path() {
        let err = validate_adb_program("/this/path/should/not/exist/adb").unwrap_err();
        assert!(err.to_lowercase().contains("not found"));
    }

    #[test]
    fn validates_directory_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = validate_adb_program(dir.path().to_str().expect("utf8")).unwrap_err();
        assert!(err.contains("executable file"));
    }

    #[test]
    fn bare_name_missing_from_path_is_rejected() {
        let err = validate_adb_program("adb-panel-no-such-tool").unwrap_err();
        assert!(err.contains("not found on PATH"));
    }

    #[cfg(unix)]
    #[test]
    fn bare_name_found_on_path() {
        assert!(validate_adb_program("sh").is_ok());
    }

    #[test]
    fn probe_reports_missing_tool_without_spawning() {
        let info = probe_adb("/this/path/should/not/exist/adb", "trace-probe");
        assert!(!info.available);
        assert!(info.error.is_some());
        assert!(info.version_output.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn probe_fails_when_version_exits_non_zero() {
        // `false` ignores its arguments and exits 1.
        let info = probe_adb("false", "trace-probe-false");
        assert!(!info.available);
        assert!(info.error.expect("error").contains("--version"));
    }

    #[cfg(unix)]
    #[test]
    fn probe_accepts_tool_whose_version_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("fake-adb");
        std::fs::write(&script, "#!/bin/sh\necho \"Android Debug Bridge version 1.0.41\"\n")
            .expect("write");
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let info = probe_adb(script.to_str().expect("utf8"), "trace-probe-ok");
        assert!(info.available, "{:?}", info.error);
        assert!(info.version_output.contains("Android Debug Bridge"));
    }
}
