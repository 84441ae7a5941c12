//! The façade both presentation layers drive. It owns the configuration, the resolved tool
//! locations and the command runner, and converts finished work into display text.

use std::time::Duration;

use chrono::Local;
use tracing::{error, info, warn};

use crate::app::adb::locator::{probe_adb, ADB_MISSING_MESSAGE};
use crate::app::adb::paths::with_trailing_separator;
use crate::app::adb::scrcpy::check_scrcpy_availability;
use crate::app::config::{resolve_default_local_dir, AppConfig};
use crate::app::error::AppError;
use crate::app::models::{AdbInfo, CompletionView, DefaultPaths, OperationDescriptor, SubmitReceipt};
use crate::app::adb::runner::RawOutput;
use crate::app::operations::{
    follow_up, format_command, resolve_params, FormatContext, OperationKind, OperationParams,
    OPERATIONS,
};
use crate::app::output::{format_output, screenshot_copy, screenshot_step_succeeded};
use crate::app::scheduler::{Completion, CommandRunner, Executor, BUSY_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Primary,
    FollowUp,
}

/// What travels with an invocation so its result can be rendered and routed back.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub kind: OperationKind,
    pub params: OperationParams,
    pub control: Option<String>,
    pub step: Step,
    pub trace_id: String,
}

pub struct Panel {
    config: AppConfig,
    context: FormatContext,
    runner: CommandRunner<PendingRequest>,
}

impl Panel {
    pub fn new(config: AppConfig) -> Self {
        let runner = CommandRunner::new(Duration::from_secs(config.command.timeout_secs));
        Self::assemble(config, runner)
    }

    pub fn with_executor(config: AppConfig, executor: Executor) -> Self {
        let runner =
            CommandRunner::with_executor(Duration::from_secs(config.command.timeout_secs), executor);
        Self::assemble(config, runner)
    }

    fn assemble(config: AppConfig, runner: CommandRunner<PendingRequest>) -> Self {
        let context = FormatContext::from_config(&config);
        Self {
            config,
            context,
            runner,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The device bridge must be present and answer `--version`; anything else is fatal for the
    /// caller. The mirroring tool is optional and only logged.
    pub fn startup_check(&self, trace_id: &str) -> Result<AdbInfo, AppError> {
        let info = probe_adb(&self.context.adb_program, trace_id);
        if !info.available {
            error!(
                trace_id = %trace_id,
                program = %info.command_path,
                reason = info.error.as_deref().unwrap_or_default(),
                "device bridge unavailable"
            );
            return Err(AppError::dependency(ADB_MISSING_MESSAGE, trace_id));
        }

        let scrcpy = check_scrcpy_availability(&self.config.scrcpy);
        if scrcpy.available {
            info!(
                trace_id = %trace_id,
                program = %scrcpy.command_path,
                version = %scrcpy.version_output,
                "screen mirroring available"
            );
        } else {
            warn!(
                trace_id = %trace_id,
                program = %scrcpy.command_path,
                "screen mirroring tool not found; cast_screen will fail"
            );
        }
        Ok(info)
    }

    pub fn operations(&self) -> Vec<OperationDescriptor> {
        OPERATIONS
            .iter()
            .map(|entry| OperationDescriptor {
                kind: entry.kind,
                label: entry.label,
                fields: entry.fields,
                command_hint: entry.command_hint,
            })
            .collect()
    }

    pub fn default_paths(&self) -> DefaultPaths {
        let local_dir = resolve_default_local_dir(&self.config.paths.default_local_dir);
        DefaultPaths {
            local_dir: with_trailing_separator(&local_dir),
            device_root: self.config.paths.device_root.clone(),
        }
    }

    /// Busy is checked before the input so a rejected request never touches the filesystem.
    pub fn submit(
        &self,
        kind: OperationKind,
        params: OperationParams,
        control: Option<String>,
        trace_id: &str,
    ) -> Result<SubmitReceipt, AppError> {
        if self.runner.is_running() {
            warn!(trace_id = %trace_id, kind = %kind, "rejected while another command is running");
            return Err(AppError::busy(BUSY_MESSAGE, trace_id));
        }

        let context = self.context.clone().at(Local::now());
        let invocation = format_command(kind, &params, &context, trace_id).map_err(|err| {
            info!(trace_id = %trace_id, kind = %kind, error = %err.error, "precondition failed");
            err
        })?;
        let command_line = invocation.command_line();
        let request = PendingRequest {
            kind,
            params: resolve_params(kind, params, &context),
            control: control.clone(),
            step: Step::Primary,
            trace_id: trace_id.to_string(),
        };
        let ticket = self.runner.submit(invocation, request, trace_id)?;
        Ok(SubmitReceipt {
            ticket,
            kind,
            command_line,
            control,
        })
    }

    pub fn drain(&self) -> Vec<CompletionView> {
        self.runner
            .drain()
            .into_iter()
            .map(|completion| self.complete(completion))
            .collect()
    }

    /// Renders one completion and, when the operation has a second step and the first one came
    /// back clean, starts that step for the same control.
    fn complete(&self, completion: Completion<PendingRequest>) -> CompletionView {
        let PendingRequest {
            kind,
            params,
            control,
            step,
            trace_id,
        } = completion.context;
        let output = completion.output;
        let mut display = match step {
            Step::Primary => format_output(kind, &params, &output),
            Step::FollowUp => format_follow_up(kind, &params, &output),
        };

        let mut pending_follow_up = false;
        let next = match step {
            Step::Primary if follow_up_allowed(kind, &output) => {
                follow_up(kind, &params, &self.context)
            }
            _ => None,
        };
        if let Some(invocation) = next {
            let request = PendingRequest {
                kind,
                params,
                control: control.clone(),
                step: Step::FollowUp,
                trace_id: trace_id.clone(),
            };
            match self.runner.submit(invocation, request, &trace_id) {
                Ok(_) => pending_follow_up = true,
                Err(err) => {
                    warn!(trace_id = %trace_id, kind = %kind, error = %err.error, "follow-up not started");
                    display = format!("{display}\n\nFollow-up not started: {}", err.error);
                }
            }
        }

        CompletionView {
            ticket: completion.ticket,
            kind,
            display,
            exit_code: output.exit_code,
            elapsed_ms: completion.elapsed.as_millis() as u64,
            control,
            pending_follow_up,
        }
    }

    pub fn progress_tick(&self) -> Option<String> {
        self.runner
            .progress_tick()
            .map(|elapsed| progress_message(elapsed.as_secs()))
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }
}

pub fn progress_message(seconds: u64) -> String {
    format!("Still running... ({seconds}s)")
}

fn follow_up_allowed(kind: OperationKind, output: &RawOutput) -> bool {
    match kind {
        OperationKind::Screenshot => screenshot_step_succeeded(output),
        _ => output.error.is_none(),
    }
}

fn format_follow_up(kind: OperationKind, params: &OperationParams, output: &RawOutput) -> String {
    match kind {
        OperationKind::Screenshot => screenshot_copy(params, output),
        _ => format_output(kind, params, output),
    }
}
