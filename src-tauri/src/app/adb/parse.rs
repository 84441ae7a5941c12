use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::app::models::DeviceSummary;

pub fn parse_adb_devices(output: &str) -> Vec<DeviceSummary> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 2 {
                return None;
            }
            Some(DeviceSummary {
                serial: tokens[0].to_string(),
                state: tokens[1].to_string(),
            })
        })
        .collect()
}

pub fn parse_getprop_map(output: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('[') {
            continue;
        }
        let Some((key_part, value_part)) = trimmed.split_once("]: [") else {
            continue;
        };
        let key = key_part.trim_start_matches('[').trim();
        let value = value_part.trim_end_matches(']').trim();
        if !key.is_empty() {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

/// `pm list packages` lines whose package name contains `fragment` (case-insensitive), with the
/// `package:` prefix stripped.
pub fn filter_package_lines(output: &str, fragment: &str) -> Vec<String> {
    let needle = fragment.trim().to_lowercase();
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("package:"))
        .filter(|name| name.to_lowercase().contains(&needle))
        .map(str::to_string)
        .collect()
}

/// First `mCurrentFocus` / `mFocusedApp` line of `dumpsys window`.
pub fn find_focus_line(output: &str) -> Option<&str> {
    output
        .lines()
        .find(|line| line.contains("mCurrentFocus") || line.contains("mFocusedApp"))
        .map(str::trim)
}

/// Pulls `com.example/.MainActivity` out of a focus line.
pub fn extract_focus_component(line: &str) -> Option<String> {
    static COMPONENT_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = COMPONENT_RE
        .get_or_init(|| Regex::new(r"([A-Za-z][\w.]*/[\w.$]+)").ok())
        .as_ref()?;
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
