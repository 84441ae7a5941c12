use serde::{Deserialize, Serialize};

use crate::app::operations::{FieldName, OperationKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdbInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSummary {
    pub serial: String,
    pub state: String,
}

/// One row of the operation table as the front-end sees it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    pub label: &'static str,
    pub fields: &'static [FieldName],
    pub command_hint: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub ticket: u64,
    pub kind: OperationKind,
    pub command_line: String,
    pub control: Option<String>,
}

/// A finished request, already converted to display text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompletionView {
    pub ticket: u64,
    pub kind: OperationKind,
    pub control: Option<String>,
    pub display: String,
    pub exit_code: Option<i32>,
    pub elapsed_ms: u64,
    /// A second step was started for the same request; its completion follows in a later drain.
    pub pending_follow_up: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DefaultPaths {
    pub local_dir: String,
    pub device_root: String,
}
