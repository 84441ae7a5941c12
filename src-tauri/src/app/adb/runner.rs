use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::app::error::AppError;
use crate::app::invocation::{Invocation, LaunchMode};

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// What the worker hands back: captured text plus how the process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawOutput {
    /// stdout followed by stderr.
    pub text: String,
    pub exit_code: Option<i32>,
    /// Set when the process could not be launched, polled, or finished in time.
    pub error: Option<String>,
}

impl RawOutput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code: Some(0),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            exit_code: None,
            error: Some(message.into()),
        }
    }
}

pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| AppError::system(format!("Failed to spawn command: {err}"), trace_id))?;

    // Drain stdout/stderr in parallel; otherwise, a chatty child process can block once the pipe
    // buffer fills, and we will incorrectly hit the timeout.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;

    let stdout_handle = std::thread::spawn(move || read_to_end(stdout));
    let stderr_handle = std::thread::spawn(move || read_to_end(stderr));

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(AppError::system(
                        format!("Command timed out after {}s", timeout.as_secs()),
                        trace_id,
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(AppError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

fn read_to_end(mut reader: impl Read) -> Vec<u8> {
    let mut buffer = Vec::<u8>::new();
    let mut temp = [0u8; 4096];
    loop {
        match reader.read(&mut temp) {
            Ok(0) => break,
            Ok(count) => buffer.extend_from_slice(&temp[..count]),
            Err(_) => break,
        }
    }
    buffer
}

/// Spawns a process that outlives the request. A reaper thread waits on it so it never lingers
/// as a zombie.
pub fn spawn_detached(program: &str, args: &[String], trace_id: &str) -> Result<u32, AppError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| AppError::system(format!("Failed to spawn command: {err}"), trace_id))?;
    let pid = child.id();
    let trace_id = trace_id.to_string();
    std::thread::spawn(move || match child.wait() {
        Ok(status) => info!(trace_id = %trace_id, pid, code = ?status.code(), "detached process exited"),
        Err(err) => warn!(trace_id = %trace_id, pid, error = %err, "failed to wait on detached process"),
    });
    Ok(pid)
}

/// Runs one invocation to completion. Never fails: every execution problem is folded into the
/// returned `RawOutput`.
pub fn execute_invocation(invocation: &Invocation, timeout: Duration, trace_id: &str) -> RawOutput {
    match invocation.mode() {
        LaunchMode::Detached => {
            match spawn_detached(invocation.program(), invocation.args(), trace_id) {
                Ok(_) => RawOutput::from_text(""),
                Err(err) => RawOutput::failed(err.error),
            }
        }
        LaunchMode::Captured => {
            match run_command_with_timeout(invocation.program(), invocation.args(), timeout, trace_id)
            {
                Ok(output) => RawOutput {
                    text: format!("{}{}", output.stdout, output.stderr),
                    exit_code: output.exit_code,
                    error: None,
                },
                Err(err) => RawOutput::failed(err.error),
            }
        }
    }
}
