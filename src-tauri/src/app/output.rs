//! Output Formatter: turns the captured text of a finished invocation into the message shown to
//! the operator. The device bridge is opaque, so classification is substring matching against
//! the fixed markers below; the first matching rule wins.

use crate::app::adb::parse::{
    extract_focus_component, filter_package_lines, find_focus_line, parse_adb_devices,
    parse_getprop_map,
};
use crate::app::adb::runner::RawOutput;
use crate::app::operations::{lookup, FieldName, OperationKind, OperationParams};

/// Matched case-insensitively.
pub const NO_DEVICES_MARKER: &str = "no devices";
pub const NO_DEVICES_MESSAGE: &str = "No devices connected!";
/// Matched case-insensitively.
pub const SUCCESS_MARKER: &str = "success";
/// Matched case-insensitively.
pub const FAILED_MARKER: &str = "failed";
/// Matched case-insensitively.
pub const ERROR_MARKER: &str = "error";
/// Matched case-sensitively.
pub const ERROR_MARKER_EXACT: &str = "Error";
/// Matched case-insensitively.
pub const NOT_FOUND_MARKER: &str = "not found";
/// Matched case-sensitively.
pub const FOCUS_MARKERS: [&str; 2] = ["mCurrentFocus", "mFocusedApp"];
pub const ATTACHED_STATE: &str = "device";

pub const NO_PACKAGE_MESSAGE: &str = "No package found!";
pub const NO_OUTPUT_MESSAGE: &str = "(no output)";

/// getprop keys shown by the device info operation, in display order.
pub const DEVICE_INFO_PROPS: [(&str, &str); 7] = [
    ("persist.sys.product.model", "Model Number"),
    ("pwv.project", "Project"),
    ("persist.sys.sw.version", "OS Version"),
    ("ro.ufs.build.version", "UFS version"),
    ("ro.serialno", "Serial Number"),
    ("ro.build.version.release", "Android version"),
    ("ro.build.version.sdk", "SDK(API) version"),
];

pub struct OutputInput<'a> {
    pub params: &'a OperationParams,
    pub text: &'a str,
    pub command_hint: &'static str,
    lower: String,
}

impl<'a> OutputInput<'a> {
    pub fn new(params: &'a OperationParams, text: &'a str, command_hint: &'static str) -> Self {
        Self {
            params,
            text,
            command_hint,
            lower: text.to_lowercase(),
        }
    }

    /// `marker` must be lower case.
    fn contains_ci(&self, marker: &str) -> bool {
        self.lower.contains(marker)
    }

    fn no_devices(&self) -> bool {
        self.contains_ci(NO_DEVICES_MARKER)
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn command_run(&self) -> String {
        format!("\n\nCommand run: \"{}\"", self.command_hint)
    }
}

/// Never fails: execution errors become `Error: ...`, everything else goes through the
/// operation's own rules.
pub fn format_output(kind: OperationKind, params: &OperationParams, raw: &RawOutput) -> String {
    if let Some(error) = &raw.error {
        return format!("Error: {error}");
    }
    let entry = lookup(kind);
    (entry.display)(&OutputInput::new(params, &raw.text, entry.command_hint))
}

pub fn device_info(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    let props = parse_getprop_map(input.text);
    if props.is_empty() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    let value = |key: &str| {
        props
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .unwrap_or("N/A")
            .to_string()
    };
    let mut lines = vec!["Device Information:".to_string()];
    lines.push(format!(
        "{}: {}-{}",
        DEVICE_INFO_PROPS[0].1,
        value(DEVICE_INFO_PROPS[0].0),
        value(DEVICE_INFO_PROPS[1].0)
    ));
    for (key, label) in DEVICE_INFO_PROPS.iter().skip(2) {
        lines.push(format!("{label}: {}", value(key)));
    }
    format!("{}{}", lines.join("\n"), input.command_run())
}

pub fn devices(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    let summaries = parse_adb_devices(input.text);
    if !summaries
        .iter()
        .any(|summary| summary.state.contains(ATTACHED_STATE))
    {
        return format!("{NO_DEVICES_MESSAGE}{}", input.command_run());
    }
    let lines = summaries
        .iter()
        .map(|summary| {
            if summary.state == ATTACHED_STATE {
                format!("{} → Connected", summary.serial)
            } else {
                format!("{}\t{}", summary.serial, summary.state)
            }
        })
        .collect::<Vec<_>>();
    format!("{}{}", lines.join("\n"), input.command_run())
}

pub fn install(input: &OutputInput<'_>) -> String {
    if input.contains_ci(SUCCESS_MARKER) {
        return format!("Installation Successful!{}", input.command_run());
    }
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    format!("Installation Result:\n{}{}", input.text, input.command_run())
}

pub fn search(input: &OutputInput<'_>) -> String {
    if input.is_blank() {
        return format!("{NO_PACKAGE_MESSAGE}{}", input.command_run());
    }
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    let matches = filter_package_lines(input.text, input.params.get(FieldName::Package));
    if matches.is_empty() {
        return format!("{NO_PACKAGE_MESSAGE}{}", input.command_run());
    }
    format!("{}{}", matches.join("\n"), input.command_run())
}

pub fn uninstall(input: &OutputInput<'_>) -> String {
    if input.contains_ci(SUCCESS_MARKER) {
        return "Uninstallation Successful!".to_string();
    }
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    format!("Uninstallation Result:\n{}{}", input.text, input.command_run())
}

/// No device rule here: a device outside sideload mode surfaces as `failed`.
pub fn sideload(input: &OutputInput<'_>) -> String {
    if input.contains_ci(FAILED_MARKER) {
        return format!(
            "Make sure the device is in sideload mode and try again.\n(Select \"Apply update from ADB\" in Recovery Mode)\n\n{}",
            input.text
        );
    }
    format!(
        "Sideloading Finished. (Check output below.)\n\n{}{}",
        input.text,
        input.command_run()
    )
}

fn acknowledge(input: &OutputInput<'_>, message: &str) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    format!("{message}{}", input.command_run())
}

pub fn shutdown(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Shutdown initiated")
}

pub fn recovery(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Recovery initiated")
}

pub fn reboot(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Reboot initiated")
}

pub fn key_back(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Back command executed")
}

pub fn key_home(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Home command executed")
}

pub fn key_app_switch(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Applications command executed")
}

pub fn volume_up(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Volume Up command executed")
}

pub fn power(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Power (Lock/Unlock) command executed")
}

pub fn volume_down(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Volume Down command executed")
}

pub fn settings(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Settings command executed")
}

pub fn factory_test(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Factory Test command executed")
}

pub fn text_entered(input: &OutputInput<'_>) -> String {
    acknowledge(input, "Text entered.")
}

pub fn storage(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    format!("Device Storage:\n{}{}", input.text, input.command_run())
}

pub fn push(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    if input.contains_ci(FAILED_MARKER) {
        return format!("Push failed. Check the local and device paths.\n\n{}", input.text);
    }
    format!("File pushed successfully:\n{}{}", input.text, input.command_run())
}

pub fn pull(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    if input.contains_ci(FAILED_MARKER) {
        return format!("Pull failed. Check the device and local paths.\n\n{}", input.text);
    }
    format!("File pulled successfully:\n{}{}", input.text, input.command_run())
}

pub fn screenshot(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    if input.contains_ci(FAILED_MARKER) || input.contains_ci(ERROR_MARKER) {
        return format!("Screenshot failed. Check the device state.\n\n{}", input.text);
    }
    format!(
        "Screenshot taken on device: {}\nCopying to {} ...{}",
        input.params.get(FieldName::DevicePath),
        input.params.get(FieldName::LocalPath),
        input.command_run()
    )
}

/// Whether a screenshot step came back clean. Mirrors the failure rules of [`screenshot`].
pub fn screenshot_step_succeeded(raw: &RawOutput) -> bool {
    if raw.error.is_some() {
        return false;
    }
    let lower = raw.text.to_lowercase();
    ![NO_DEVICES_MARKER, FAILED_MARKER, ERROR_MARKER]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Display for the copy step of a screenshot: the pull rules plus where the file landed.
pub fn screenshot_copy(params: &OperationParams, raw: &RawOutput) -> String {
    let display = format_output(OperationKind::PullFile, params, raw);
    if !screenshot_step_succeeded(raw) {
        return display;
    }
    format!("{display}\nSaved to: {}", params.get(FieldName::LocalPath))
}

pub fn network(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    if input.is_blank() {
        return "Network check returned no output. Device might be offline or command unsupported."
            .to_string();
    }
    format!("Network configuration:\n{}{}", input.text, input.command_run())
}

pub fn activity(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    if !FOCUS_MARKERS.iter().any(|marker| input.text.contains(marker)) {
        return format!("No current activity found. Output:\n{}", input.text);
    }
    match find_focus_line(input.text) {
        Some(line) => {
            let component = extract_focus_component(line)
                .map(|component| format!("\nComponent: {component}"))
                .unwrap_or_default();
            format!("Current focus:\n{line}{component}{}", input.command_run())
        }
        None => format!("Current activity (raw output):\n{}", input.text),
    }
}

pub fn cast_screen(input: &OutputInput<'_>) -> String {
    if input.contains_ci(ERROR_MARKER) {
        return NO_DEVICES_MESSAGE.to_string();
    }
    "CASTING started in the BACKGROUND".to_string()
}

pub fn command(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    if input.is_blank() {
        return NO_OUTPUT_MESSAGE.to_string();
    }
    input.text.to_string()
}

pub fn start_activity(input: &OutputInput<'_>) -> String {
    if input.no_devices() {
        return NO_DEVICES_MESSAGE.to_string();
    }
    if input.text.contains(ERROR_MARKER_EXACT) || input.contains_ci(NOT_FOUND_MARKER) {
        return format!(
            "Failed to start activity. Check the package/activity name.\n\n{}",
            input.text
        );
    }
    format!(
        "Activity started (or adb returned output):\n{}{}",
        input.text,
        input.command_run()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::operations::OPERATIONS;

    fn render(kind: OperationKind, text: &str) -> String {
        format_output(kind, &OperationParams::default(), &RawOutput::from_text(text))
    }

    fn render_with(kind: OperationKind, params: OperationParams, text: &str) -> String {
        format_output(kind, &params, &RawOutput::from_text(text))
    }

    #[test]
    fn list_devices_marks_attached_devices_connected() {
        let display = render(
            OperationKind::ListDevices,
            "List of devices attached\nABC123\tdevice\n",
        );
        assert!(display.contains("ABC123 → Connected"), "{display}");
        assert!(display.ends_with("Command run: \"adb devices\""));
    }

    #[test]
    fn list_devices_header_only_is_no_devices() {
        let display = render(OperationKind::ListDevices, "List of devices attached");
        assert!(display.starts_with(NO_DEVICES_MESSAGE), "{display}");
    }

    #[test]
    fn list_devices_keeps_other_states_and_skips_daemon_noise() {
        let display = render(
            OperationKind::ListDevices,
            "List of devices attached\nABC123\tdevice\nXYZ\tunauthorized\n* daemon started successfully\n",
        );
        assert!(display.contains("ABC123 → Connected"));
        assert!(display.contains("XYZ\tunauthorized"));
        assert!(!display.contains("daemon"));
    }

    #[test]
    fn list_devices_only_unauthorized_is_no_devices() {
        let display = render(OperationKind::ListDevices, "List of devices attached\nXYZ\tunauthorized\n");
        assert!(display.starts_with(NO_DEVICES_MESSAGE));
    }

    #[test]
    fn empty_output_is_handled_for_every_operation() {
        for entry in OPERATIONS.iter() {
            let display = render(entry.kind, "");
            assert!(!display.is_empty(), "{} rendered nothing", entry.kind);
        }
    }

    #[test]
    fn no_devices_marker_wins_for_operations_without_an_earlier_marker() {
        let raw = "adb: error: no devices/emulators found\n";
        // Sideload has no device check of its own.
        for entry in OPERATIONS.iter() {
            let display = render(entry.kind, raw);
            match entry.kind {
                OperationKind::SideloadFirmware => {
                    assert!(display.starts_with("Sideloading Finished."), "{display}")
                }
                _ => assert_eq!(display, NO_DEVICES_MESSAGE, "{}", entry.kind),
            }
        }
    }

    #[test]
    fn execution_errors_are_reported_verbatim() {
        let raw = RawOutput::failed("Command timed out after 300s");
        for entry in OPERATIONS.iter() {
            assert_eq!(
                format_output(entry.kind, &OperationParams::default(), &raw),
                "Error: Command timed out after 300s"
            );
        }
    }

    #[test]
    fn install_success_is_case_insensitive() {
        assert!(render(OperationKind::InstallApk, "Performing Streamed Install\nSuccess\n")
            .starts_with("Installation Successful!"));
        assert!(render(OperationKind::InstallApk, "SUCCESS").starts_with("Installation Successful!"));
        let failure = render(
            OperationKind::InstallApk,
            "adb: failed to install app.apk: Failure [INSTALL_FAILED_VERSION_DOWNGRADE]",
        );
        assert!(failure.starts_with("Installation Result:\nadb: failed to install"));
    }

    #[test]
    fn uninstall_success_has_no_hint() {
        assert_eq!(render(OperationKind::UninstallPackage, "Success\n"), "Uninstallation Successful!");
        assert!(render(OperationKind::UninstallPackage, "Failure [DELETE_FAILED_INTERNAL_ERROR]")
            .starts_with("Uninstallation Result:"));
    }

    #[test]
    fn search_filters_packages_by_fragment() {
        let params = OperationParams {
            package: Some("chrome".to_string()),
            ..OperationParams::default()
        };
        let display = render_with(
            OperationKind::SearchPackages,
            params.clone(),
            "package:com.android.chrome\npackage:com.example.app\n",
        );
        assert!(display.starts_with("com.android.chrome\n\nCommand run:"), "{display}");
        assert!(!display.contains("com.example.app"));

        let none = render_with(OperationKind::SearchPackages, params, "package:com.example.app\n");
        assert!(none.starts_with(NO_PACKAGE_MESSAGE));
        assert!(render(OperationKind::SearchPackages, "  \n").starts_with(NO_PACKAGE_MESSAGE));
    }

    #[test]
    fn sideload_failure_explains_sideload_mode() {
        let display = render(
            OperationKind::SideloadFirmware,
            "adb: sideload connection failed: closed",
        );
        assert!(display.starts_with("Make sure the device is in sideload mode"));
        assert!(display.ends_with("adb: sideload connection failed: closed"));
    }

    #[test]
    fn push_and_pull_report_failures() {
        assert!(render(OperationKind::PushFile, "adb: error: failed to stat remote object")
            .starts_with("Push failed."));
        assert!(render(OperationKind::PullFile, "/sdcard/a: 1 file pulled, 0 skipped.")
            .starts_with("File pulled successfully:"));
    }

    #[test]
    fn network_blank_output_is_explained() {
        assert!(render(OperationKind::NetworkConfig, "\n")
            .starts_with("Network check returned no output."));
        assert!(render(OperationKind::NetworkConfig, "wlan0 Link encap:UNSPEC")
            .starts_with("Network configuration:\nwlan0"));
    }

    #[test]
    fn activity_picks_the_focus_line() {
        let display = render(
            OperationKind::CurrentActivity,
            "junk\n  mCurrentFocus=Window{1a2b u0 com.android.settings/com.android.settings.Settings}\n",
        );
        assert!(display.starts_with(
            "Current focus:\nmCurrentFocus=Window{1a2b u0 com.android.settings/com.android.settings.Settings}"
        ));
        assert!(display.contains("Component: com.android.settings/com.android.settings.Settings"));
        assert!(render(OperationKind::CurrentActivity, "nothing")
            .starts_with("No current activity found."));
    }

    #[test]
    fn cast_screen_reports_background_start() {
        assert_eq!(render(OperationKind::CastScreen, ""), "CASTING started in the BACKGROUND");
        assert_eq!(
            render(OperationKind::CastScreen, "ERROR: Could not find any ADB device"),
            NO_DEVICES_MESSAGE
        );
    }

    #[test]
    fn start_activity_error_marker_is_case_sensitive() {
        assert!(render(OperationKind::StartActivity, "Error type 3\nError: Activity class does not exist.")
            .starts_with("Failed to start activity."));
        assert!(render(OperationKind::StartActivity, "Starting: Intent { cmp=com.x/.Main }\nerror-free")
            .starts_with("Activity started"));
        assert!(render(OperationKind::StartActivity, "Activity NOT FOUND")
            .starts_with("Failed to start activity."));
    }

    #[test]
    fn execute_command_passes_output_through() {
        assert_eq!(render(OperationKind::ExecuteCommand, "hello\n"), "hello\n");
        assert_eq!(render(OperationKind::ExecuteCommand, ""), NO_OUTPUT_MESSAGE);
    }

    #[test]
    fn device_info_renders_known_properties() {
        let text = "[persist.sys.product.model]: [EA630]\n[pwv.project]: [P1]\n[ro.serialno]: [ABC123]\n[ro.build.version.release]: [14]\n[ro.build.version.sdk]: [34]\n";
        let display = render(OperationKind::DeviceInfo, text);
        assert!(display.starts_with("Device Information:\nModel Number: EA630-P1\n"), "{display}");
        assert!(display.contains("OS Version: N/A"));
        assert!(display.contains("Serial Number: ABC123"));
        assert!(display.contains("SDK(API) version: 34"));
        assert_eq!(render(OperationKind::DeviceInfo, "garbage"), NO_DEVICES_MESSAGE);
    }

    fn captured_at(device_path: &str, local_path: &str) -> OperationParams {
        OperationParams {
            device_path: Some(device_path.to_string()),
            local_path: Some(local_path.to_string()),
            ..OperationParams::default()
        }
    }

    #[test]
    fn screenshot_names_the_file_it_wrote() {
        let params = captured_at(
            "/data/local/tmp/Pictures/Screenshot_20250812_093005.png",
            "/home/tester/Desktop/Screenshot_20250812_093005.png",
        );
        let display = render_with(OperationKind::Screenshot, params, "");
        assert!(
            display.starts_with(
                "Screenshot taken on device: /data/local/tmp/Pictures/Screenshot_20250812_093005.png\nCopying to /home/tester/Desktop/Screenshot_20250812_093005.png ..."
            ),
            "{display}"
        );
    }

    #[test]
    fn screenshot_failures_are_not_reported_as_saved() {
        let display = render(OperationKind::Screenshot, "Error opening file: Read-only file system");
        assert!(display.starts_with("Screenshot failed."), "{display}");
        assert_eq!(
            render(OperationKind::Screenshot, "adb: no devices/emulators found"),
            NO_DEVICES_MESSAGE
        );
        assert!(!screenshot_step_succeeded(&RawOutput::from_text("screencap: failed")));
        assert!(!screenshot_step_succeeded(&RawOutput::failed("timed out")));
        assert!(screenshot_step_succeeded(&RawOutput::from_text("")));
    }

    #[test]
    fn screenshot_copy_reports_the_local_file() {
        let params = captured_at("/sdcard/Pictures/Screenshot_1.png", "/tmp/shots/Screenshot_1.png");
        let display = screenshot_copy(&params, &RawOutput::from_text("1 file pulled, 0 skipped."));
        assert!(display.starts_with("File pulled successfully:"), "{display}");
        assert!(display.ends_with("\nSaved to: /tmp/shots/Screenshot_1.png"));

        let failed = screenshot_copy(
            &params,
            &RawOutput::from_text("adb: error: failed to stat remote object"),
        );
        assert!(failed.starts_with("Pull failed."), "{failed}");
        assert!(!failed.contains("Saved to:"));
    }
}
