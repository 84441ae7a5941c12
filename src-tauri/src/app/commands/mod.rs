use serde::Serialize;
use tauri::State;
use tracing::info;
use uuid::Uuid;

use crate::app::error::AppError;
use crate::app::models::{
    AdbInfo, CommandResponse, CompletionView, DefaultPaths, OperationDescriptor, SubmitReceipt,
};
use crate::app::operations::{OperationKind, OperationParams};
use crate::app::state::AppState;

/// Polling cadence for the front-end timers.
#[derive(Debug, Clone, Serialize)]
pub struct TickIntervals {
    pub drain_interval_ms: u64,
    pub progress_interval_ms: u64,
}

fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[tauri::command(async)]
pub fn startup_check(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<AdbInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "startup_check");

    let info = state.panel.startup_check(&trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: info,
    })
}

#[tauri::command]
pub fn list_operations(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<OperationDescriptor>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.panel.operations(),
    })
}

#[tauri::command]
pub fn default_paths(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<DefaultPaths>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.panel.default_paths(),
    })
}

#[tauri::command]
pub fn tick_intervals(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<TickIntervals>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let command = &state.panel.config().command;
    Ok(CommandResponse {
        trace_id,
        data: TickIntervals {
            drain_interval_ms: command.drain_interval_ms,
            progress_interval_ms: command.progress_interval_ms,
        },
    })
}

#[tauri::command(async)]
pub fn submit_operation(
    kind: OperationKind,
    params: Option<OperationParams>,
    control: Option<String>,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<SubmitReceipt>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, kind = %kind, "submit_operation");

    let receipt = state
        .panel
        .submit(kind, params.unwrap_or_default(), control, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: receipt,
    })
}

#[tauri::command]
pub fn drain_results(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<CompletionView>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.panel.drain(),
    })
}

#[tauri::command]
pub fn progress_tick(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Option<String>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.panel.progress_tick(),
    })
}
