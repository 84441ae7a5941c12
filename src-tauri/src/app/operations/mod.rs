//! The operation table: every button of the panel is one row mapping a tag to its precondition
//! check, its invocation builder and its display formatter.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::app::adb::locator::resolve_adb_program;
use crate::app::adb::paths::expand_home;
use crate::app::adb::scrcpy::{build_scrcpy_args, resolve_scrcpy_program};
use crate::app::config::{resolve_default_local_dir, AppConfig};
use crate::app::error::AppError;
use crate::app::invocation::Invocation;
use crate::app::output::{self, OutputInput};

mod validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    DeviceInfo,
    ListDevices,
    InstallApk,
    SearchPackages,
    UninstallPackage,
    SideloadFirmware,
    Shutdown,
    RebootRecovery,
    Reboot,
    KeyBack,
    KeyHome,
    KeyAppSwitch,
    VolumeUp,
    Power,
    VolumeDown,
    OpenSettings,
    FactoryTest,
    ListStorage,
    PushFile,
    PullFile,
    Screenshot,
    NetworkConfig,
    CurrentActivity,
    CastScreen,
    EnterText,
    ExecuteCommand,
    StartActivity,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceInfo => "device_info",
            Self::ListDevices => "list_devices",
            Self::InstallApk => "install_apk",
            Self::SearchPackages => "search_packages",
            Self::UninstallPackage => "uninstall_package",
            Self::SideloadFirmware => "sideload_firmware",
            Self::Shutdown => "shutdown",
            Self::RebootRecovery => "reboot_recovery",
            Self::Reboot => "reboot",
            Self::KeyBack => "key_back",
            Self::KeyHome => "key_home",
            Self::KeyAppSwitch => "key_app_switch",
            Self::VolumeUp => "volume_up",
            Self::Power => "power",
            Self::VolumeDown => "volume_down",
            Self::OpenSettings => "open_settings",
            Self::FactoryTest => "factory_test",
            Self::ListStorage => "list_storage",
            Self::PushFile => "push_file",
            Self::PullFile => "pull_file",
            Self::Screenshot => "screenshot",
            Self::NetworkConfig => "network_config",
            Self::CurrentActivity => "current_activity",
            Self::CastScreen => "cast_screen",
            Self::EnterText => "enter_text",
            Self::ExecuteCommand => "execute_command",
            Self::StartActivity => "start_activity",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().replace('-', "_").to_lowercase();
        OPERATIONS
            .iter()
            .map(|entry| entry.kind)
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("Unknown operation: {value}"))
    }
}

/// Input fields an operation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    LocalPath,
    DevicePath,
    Package,
    Text,
    Component,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationParams {
    pub local_path: Option<String>,
    pub device_path: Option<String>,
    pub package: Option<String>,
    pub text: Option<String>,
    pub component: Option<String>,
}

impl OperationParams {
    /// Trimmed value of `field`, empty when unset.
    pub fn get(&self, field: FieldName) -> &str {
        let value = match field {
            FieldName::LocalPath => &self.local_path,
            FieldName::DevicePath => &self.device_path,
            FieldName::Package => &self.package,
            FieldName::Text => &self.text,
            FieldName::Component => &self.component,
        };
        value.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// Everything an invocation depends on besides the operator's input. `now` is sampled once when
/// the context is created, so formatting twice with the same context is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatContext {
    pub adb_program: String,
    pub scrcpy_program: String,
    pub scrcpy_args: Vec<String>,
    pub device_root: String,
    /// Where files copied off the device land when the operator names no destination.
    pub local_dir: PathBuf,
    pub now: DateTime<Local>,
}

impl FormatContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            adb_program: resolve_adb_program(&config.adb.command_path),
            scrcpy_program: resolve_scrcpy_program(&config.scrcpy),
            scrcpy_args: build_scrcpy_args(&config.scrcpy),
            device_root: config.paths.device_root.clone(),
            local_dir: resolve_default_local_dir(&config.paths.default_local_dir),
            now: Local::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    fn adb<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::captured(self.adb_program.clone(), args)
    }

    fn screenshot_name(&self) -> String {
        format!("Screenshot_{}.png", self.now.format("%Y%m%d_%H%M%S"))
    }

    pub fn screenshot_device_path(&self) -> String {
        format!("{}Pictures/{}", self.device_root, self.screenshot_name())
    }

    /// `requested` may be empty (default directory), a directory, or a full file path.
    pub fn screenshot_local_path(&self, requested: &str) -> PathBuf {
        if requested.is_empty() {
            return self.local_dir.join(self.screenshot_name());
        }
        let path = expand_home(requested);
        if requested.ends_with(['/', '\\']) || path.is_dir() {
            path.join(self.screenshot_name())
        } else {
            path
        }
    }
}

type Validator = fn(&OperationParams, &FormatContext) -> Result<(), String>;
type Builder = fn(&OperationParams, &FormatContext) -> Invocation;
type Renderer = fn(&OutputInput<'_>) -> String;

pub struct OperationEntry {
    pub kind: OperationKind,
    pub label: &'static str,
    pub fields: &'static [FieldName],
    /// The command as shown to the operator after it ran.
    pub command_hint: &'static str,
    pub validate: Validator,
    pub build: Builder,
    pub display: Renderer,
}

pub static OPERATIONS: [OperationEntry; 27] = [
    OperationEntry {
        kind: OperationKind::DeviceInfo,
        label: "Get Device Info",
        fields: &[],
        command_hint: "adb shell getprop <property>",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "getprop"]),
        display: output::device_info,
    },
    OperationEntry {
        kind: OperationKind::ListDevices,
        label: "List Devices",
        fields: &[],
        command_hint: "adb devices",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["devices"]),
        display: output::devices,
    },
    OperationEntry {
        kind: OperationKind::InstallApk,
        label: "Install APK",
        fields: &[FieldName::LocalPath],
        command_hint: "adb install <APK_PATH>",
        validate: validate::apk_file,
        build: |params, ctx| {
            let path = expand_home(params.get(FieldName::LocalPath));
            ctx.adb(["install".to_string(), path.display().to_string()])
        },
        display: output::install,
    },
    OperationEntry {
        kind: OperationKind::SearchPackages,
        label: "Search APK",
        fields: &[FieldName::Package],
        command_hint: "adb shell pm list packages | grep <PACKAGE_NAME>",
        validate: validate::package_fragment,
        build: |_, ctx| ctx.adb(["shell", "pm", "list", "packages"]),
        display: output::search,
    },
    OperationEntry {
        kind: OperationKind::UninstallPackage,
        label: "Uninstall APK",
        fields: &[FieldName::Package],
        command_hint: "adb uninstall <PACKAGE_NAME>",
        validate: validate::package_name,
        build: |params, ctx| ctx.adb(["uninstall", params.get(FieldName::Package)]),
        display: output::uninstall,
    },
    OperationEntry {
        kind: OperationKind::SideloadFirmware,
        label: "Sideload firmware",
        fields: &[FieldName::LocalPath],
        command_hint: "adb sideload <FIRMWARE_PATH>.zip",
        validate: validate::firmware_file,
        build: |params, ctx| {
            let path = expand_home(params.get(FieldName::LocalPath));
            ctx.adb(["sideload".to_string(), path.display().to_string()])
        },
        display: output::sideload,
    },
    OperationEntry {
        kind: OperationKind::Shutdown,
        label: "Shutdown",
        fields: &[],
        command_hint: "adb reboot -p",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["reboot", "-p"]),
        display: output::shutdown,
    },
    OperationEntry {
        kind: OperationKind::RebootRecovery,
        label: "Recovery Mode",
        fields: &[],
        command_hint: "adb reboot recovery",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["reboot", "recovery"]),
        display: output::recovery,
    },
    OperationEntry {
        kind: OperationKind::Reboot,
        label: "Reboot",
        fields: &[],
        command_hint: "adb reboot",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["reboot"]),
        display: output::reboot,
    },
    OperationEntry {
        kind: OperationKind::KeyBack,
        label: "Back",
        fields: &[],
        command_hint: "adb shell input keyevent 4",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "input", "keyevent", "4"]),
        display: output::key_back,
    },
    OperationEntry {
        kind: OperationKind::KeyHome,
        label: "Home",
        fields: &[],
        command_hint: "adb shell input keyevent 3",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "input", "keyevent", "3"]),
        display: output::key_home,
    },
    OperationEntry {
        kind: OperationKind::KeyAppSwitch,
        label: "Applications",
        fields: &[],
        command_hint: "adb shell input keyevent 187",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "input", "keyevent", "187"]),
        display: output::key_app_switch,
    },
    OperationEntry {
        kind: OperationKind::VolumeUp,
        label: "Volume Up",
        fields: &[],
        command_hint: "adb shell input keyevent 24",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "input", "keyevent", "24"]),
        display: output::volume_up,
    },
    OperationEntry {
        kind: OperationKind::Power,
        label: "Lock/Unlock",
        fields: &[],
        command_hint: "adb shell input keyevent 26",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "input", "keyevent", "26"]),
        display: output::power,
    },
    OperationEntry {
        kind: OperationKind::VolumeDown,
        label: "Volume Down",
        fields: &[],
        command_hint: "adb shell input keyevent 25",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "input", "keyevent", "25"]),
        display: output::volume_down,
    },
    OperationEntry {
        kind: OperationKind::OpenSettings,
        label: "Settings",
        fields: &[],
        command_hint: "adb shell am start -n com.android.settings/.Settings",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "am", "start", "-n", "com.android.settings/.Settings"]),
        display: output::settings,
    },
    OperationEntry {
        kind: OperationKind::FactoryTest,
        label: "Factory Test",
        fields: &[],
        command_hint: "adb shell am start -n com.ubx.factorykit/.Framework.Framework",
        validate: validate::nothing,
        build: |_, ctx| {
            ctx.adb([
                "shell",
                "am",
                "start",
                "-n",
                "com.ubx.factorykit/.Framework.Framework",
            ])
        },
        display: output::factory_test,
    },
    OperationEntry {
        kind: OperationKind::ListStorage,
        label: "Check Device Storage",
        fields: &[FieldName::DevicePath],
        command_hint: "adb shell ls -l <DEVICE_PATH>",
        validate: validate::storage_path,
        build: |params, ctx| {
            let path = quote_for_device_shell(params.get(FieldName::DevicePath));
            ctx.adb(["shell".to_string(), "ls".to_string(), "-l".to_string(), path])
        },
        display: output::storage,
    },
    OperationEntry {
        kind: OperationKind::PushFile,
        label: "Push File to device",
        fields: &[FieldName::LocalPath, FieldName::DevicePath],
        command_hint: "adb push <LOCAL_PATH> <DEVICE_PATH>",
        validate: validate::push_paths,
        build: |params, ctx| {
            let local = expand_home(params.get(FieldName::LocalPath));
            ctx.adb([
                "push".to_string(),
                local.display().to_string(),
                params.get(FieldName::DevicePath).to_string(),
            ])
        },
        display: output::push,
    },
    OperationEntry {
        kind: OperationKind::PullFile,
        label: "Pull File from device",
        fields: &[FieldName::DevicePath, FieldName::LocalPath],
        command_hint: "adb pull <DEVICE_PATH> <LOCAL_PATH>",
        validate: validate::pull_paths,
        build: |params, ctx| {
            let local = expand_home(params.get(FieldName::LocalPath));
            ctx.adb([
                "pull".to_string(),
                params.get(FieldName::DevicePath).to_string(),
                local.display().to_string(),
            ])
        },
        display: output::pull,
    },
    OperationEntry {
        kind: OperationKind::Screenshot,
        label: "Screen Shot",
        fields: &[FieldName::LocalPath],
        command_hint: "adb shell screencap -p /sdcard/Pictures/<Screenshot_Timestamp>.png",
        validate: validate::nothing,
        build: |_, ctx| {
            ctx.adb([
                "shell".to_string(),
                "screencap".to_string(),
                "-p".to_string(),
                ctx.screenshot_device_path(),
            ])
        },
        display: output::screenshot,
    },
    OperationEntry {
        kind: OperationKind::NetworkConfig,
        label: "Check Network",
        fields: &[],
        command_hint: "adb shell ifconfig",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "ifconfig"]),
        display: output::network,
    },
    OperationEntry {
        kind: OperationKind::CurrentActivity,
        label: "Check Activity",
        fields: &[],
        command_hint: "adb shell dumpsys window | grep mCurrentFocus",
        validate: validate::nothing,
        build: |_, ctx| ctx.adb(["shell", "dumpsys", "window"]),
        display: output::activity,
    },
    OperationEntry {
        kind: OperationKind::CastScreen,
        label: "Cast Screen",
        fields: &[],
        command_hint: "scrcpy",
        validate: validate::nothing,
        build: |_, ctx| Invocation::detached(ctx.scrcpy_program.clone(), ctx.scrcpy_args.clone()),
        display: output::cast_screen,
    },
    OperationEntry {
        kind: OperationKind::EnterText,
        label: "Enter Text",
        fields: &[FieldName::Text],
        command_hint: "adb shell input text <TEXT>",
        validate: validate::text,
        build: |params, ctx| {
            let text = format!("\"{}\"", params.get(FieldName::Text).replace('"', "\\\""));
            ctx.adb(["shell".to_string(), "input".to_string(), "text".to_string(), text])
        },
        display: output::text_entered,
    },
    OperationEntry {
        kind: OperationKind::ExecuteCommand,
        label: "Execute Command",
        fields: &[FieldName::Text],
        command_hint: "<COMMAND>",
        validate: validate::command_line,
        build: build_free_command,
        display: output::command,
    },
    OperationEntry {
        kind: OperationKind::StartActivity,
        label: "Start Package/Activity",
        fields: &[FieldName::Component],
        command_hint: "adb shell am start -n <PACKAGE_NAME>/<ACTIVITY_NAME>",
        validate: validate::component,
        build: |params, ctx| {
            let component = quote_for_device_shell(params.get(FieldName::Component));
            ctx.adb([
                "shell".to_string(),
                "am".to_string(),
                "start".to_string(),
                "-n".to_string(),
                component,
            ])
        },
        display: output::start_activity,
    },
];

/// The table is declared in `OperationKind` order.
pub fn lookup(kind: OperationKind) -> &'static OperationEntry {
    &OPERATIONS[kind as usize]
}

/// Command Formatter: precondition check, then exactly one invocation.
pub fn format_command(
    kind: OperationKind,
    params: &OperationParams,
    ctx: &FormatContext,
    trace_id: &str,
) -> Result<Invocation, AppError> {
    let entry = lookup(kind);
    (entry.validate)(params, ctx).map_err(|message| AppError::validation(message, trace_id))?;
    Ok((entry.build)(params, ctx))
}

/// Pins the values an operation derives from its context into the parameters, so the
/// renderer and any follow-up step see the paths the builder used.
pub fn resolve_params(
    kind: OperationKind,
    mut params: OperationParams,
    ctx: &FormatContext,
) -> OperationParams {
    if kind == OperationKind::Screenshot {
        let local = ctx.screenshot_local_path(params.get(FieldName::LocalPath));
        params.device_path = Some(ctx.screenshot_device_path());
        params.local_path = Some(local.display().to_string());
    }
    params
}

/// The second invocation of a two-step operation. It is started only after the first step
/// came back clean, with parameters already passed through [`resolve_params`].
pub fn follow_up(
    kind: OperationKind,
    params: &OperationParams,
    ctx: &FormatContext,
) -> Option<Invocation> {
    match kind {
        OperationKind::Screenshot => Some(ctx.adb([
            "pull".to_string(),
            params.get(FieldName::DevicePath).to_string(),
            params.get(FieldName::LocalPath).to_string(),
        ])),
        _ => None,
    }
}

/// `adb shell` joins its arguments into one device-side command line, so arguments that may
/// carry spaces are wrapped in double quotes for the device shell.
fn quote_for_device_shell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

fn build_free_command(params: &OperationParams, ctx: &FormatContext) -> Invocation {
    let tokens = shlex::split(params.get(FieldName::Text)).unwrap_or_default();
    let mut iter = tokens.into_iter();
    let program = match iter.next() {
        Some(first) if first == "adb" => ctx.adb_program.clone(),
        Some(first) => first,
        None => ctx.adb_program.clone(),
    };
    Invocation::captured(program, iter)
}
