//! Shape checks run before an invocation is built. They look at the operator's input and the
//! local filesystem only, never at device state.

use crate::app::adb::paths::{expand_home, has_extension, validate_device_path};

use super::{FieldName, FormatContext, OperationParams};

pub(super) fn nothing(_: &OperationParams, _: &FormatContext) -> Result<(), String> {
    Ok(())
}

pub(super) fn apk_file(params: &OperationParams, _: &FormatContext) -> Result<(), String> {
    let raw = params.get(FieldName::LocalPath);
    if raw.is_empty() {
        return Err("Please enter a valid APK path".to_string());
    }
    let path = expand_home(raw);
    if !path.is_file() || !has_extension(&path, "apk") {
        return Err("Please enter a valid APK path (file must exist and end with .apk)".to_string());
    }
    Ok(())
}

pub(super) fn firmware_file(params: &OperationParams, _: &FormatContext) -> Result<(), String> {
    let raw = params.get(FieldName::LocalPath);
    let path = expand_home(raw);
    if raw.is_empty() || !path.is_file() || !has_extension(&path, "zip") {
        return Err("Please enter a valid firmware path (.zip)".to_string());
    }
    Ok(())
}

pub(super) fn package_fragment(params: &OperationParams, _: &FormatContext) -> Result<(), String> {
    if params.get(FieldName::Package).is_empty() {
        return Err("Please enter a valid APK/package name fragment".to_string());
    }
    Ok(())
}

pub(super) fn package_name(params: &OperationParams, _: &FormatContext) -> Result<(), String> {
    let name = params.get(FieldName::Package);
    if name.is_empty() || !name.contains("com.") || name.chars().any(char::is_whitespace) {
        return Err("Please enter a valid package name (e.g. com.example.app)".to_string());
    }
    Ok(())
}

pub(super) fn storage_path(params: &OperationParams, ctx: &FormatContext) -> Result<(), String> {
    validate_device_path(params.get(FieldName::DevicePath), &ctx.device_root).map_err(|_| {
        format!(
            "Please enter a valid device storage path (starting with {})",
            ctx.device_root
        )
    })
}

pub(super) fn push_paths(params: &OperationParams, ctx: &FormatContext) -> Result<(), String> {
    let local = params.get(FieldName::LocalPath);
    if local.is_empty() || !expand_home(local).exists() {
        return Err("Please select a valid local file".to_string());
    }
    validate_device_path(params.get(FieldName::DevicePath), &ctx.device_root)
}

pub(super) fn pull_paths(params: &OperationParams, ctx: &FormatContext) -> Result<(), String> {
    validate_device_path(params.get(FieldName::DevicePath), &ctx.device_root)?;
    if params.get(FieldName::LocalPath).is_empty() {
        return Err("Please select a valid local save path".to_string());
    }
    Ok(())
}

pub(super) fn text(params: &OperationParams, _: &FormatContext) -> Result<(), String> {
    if params.get(FieldName::Text).is_empty() {
        return Err("Please enter some text".to_string());
    }
    Ok(())
}

pub(super) fn command_line(params: &OperationParams, _: &FormatContext) -> Result<(), String> {
    let raw = params.get(FieldName::Text);
    if raw.is_empty() {
        return Err("Please enter a valid command".to_string());
    }
    match shlex::split(raw) {
        Some(tokens) if !tokens.is_empty() => Ok(()),
        Some(_) => Err("Please enter a valid command".to_string()),
        None => Err("Command has unbalanced quotes".to_string()),
    }
}

pub(super) fn component(params: &OperationParams, _: &FormatContext) -> Result<(), String> {
    if params.get(FieldName::Component).is_empty() {
        return Err(
            "Please enter a valid Package/Activity (e.g. com.example/.MainActivity)".to_string(),
        );
    }
    Ok(())
}
