use std::time::{Duration, Instant};

use adb_panel_lib::app::config::{load_config, AppConfig};
use adb_panel_lib::app::logging::init_logging_with_default;
use adb_panel_lib::app::models::CompletionView;
use adb_panel_lib::app::operations::{OperationKind, OperationParams, OPERATIONS};
use adb_panel_lib::app::panel::Panel;
use serde::Serialize;
use uuid::Uuid;

const USAGE: &str = "Usage: adb_panel_cli <operation> [--local-path PATH] [--device-path PATH] [--package NAME] [--text TEXT] [--component PKG/ACTIVITY] [--json] [--quiet]\n       adb_panel_cli --list\n";

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    List,
    Run {
        kind: OperationKind,
        params: OperationParams,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Args {
    mode: Mode,
    json: bool,
    quiet: bool,
}

#[derive(Serialize)]
struct RunSummary {
    tool: &'static str,
    status: &'static str, // pass|fail
    trace_id: String,
    operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    command_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_args<I>(raw: I) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
{
    let mut operation: Option<String> = None;
    let mut params = OperationParams::default();
    let mut list = false;
    let mut json = false;
    let mut quiet = false;

    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        let mut value_for = |flag: &str| {
            it.next()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--local-path" => params.local_path = Some(value_for("--local-path")?),
            "--device-path" => params.device_path = Some(value_for("--device-path")?),
            "--package" => params.package = Some(value_for("--package")?),
            "--text" => params.text = Some(value_for("--text")?),
            "--component" => params.component = Some(value_for("--component")?),
            "--json" => json = true,
            "--quiet" => quiet = true,
            "--list" => list = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if other.starts_with("--") => return Err(format!("Unknown arg: {other}")),
            other => {
                if let Some(previous) = &operation {
                    return Err(format!("Only one operation per run (got {previous} and {other})"));
                }
                operation = Some(other.to_string());
            }
        }
    }

    let mode = match (list, operation) {
        (true, _) => Mode::List,
        (false, Some(name)) => Mode::Run {
            kind: name.parse()?,
            params,
        },
        (false, None) => return Err(USAGE.to_string()),
    };
    Ok(Args { mode, json, quiet })
}

fn print_operations(json: bool) {
    if json {
        let rows: Vec<_> = OPERATIONS
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "kind": entry.kind,
                    "label": entry.label,
                    "fields": entry.fields,
                    "command_hint": entry.command_hint,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows).unwrap_or_default());
        return;
    }
    for entry in OPERATIONS.iter() {
        println!("{:<20} {:<24} {}", entry.kind, entry.label, entry.command_hint);
    }
}

fn emit(summary: &RunSummary, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).unwrap_or_default()
        );
        return;
    }
    if let Some(display) = &summary.display {
        println!("{display}");
    }
    if let Some(error) = &summary.error {
        eprintln!("{error}");
    }
}

/// Plays the part of the UI timers: drains every drain interval and reports progress every
/// progress interval until the submitted request and any follow-up step come back. The displays
/// of all steps are joined into the returned view.
fn wait_for_completion(panel: &Panel, config: &AppConfig, show_progress: bool) -> CompletionView {
    let drain_every = Duration::from_millis(config.command.drain_interval_ms);
    let progress_every = Duration::from_millis(config.command.progress_interval_ms);
    let mut last_progress = Instant::now();
    let mut steps: Vec<String> = Vec::new();
    loop {
        std::thread::sleep(drain_every);
        for mut view in panel.drain() {
            steps.push(std::mem::take(&mut view.display));
            if view.pending_follow_up {
                continue;
            }
            view.display = steps.join("\n\n");
            return view;
        }
        if last_progress.elapsed() >= progress_every {
            last_progress = Instant::now();
            if let Some(message) = panel.progress_tick() {
                if show_progress {
                    eprintln!("{message}");
                }
            }
        }
    }
}

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let (kind, params) = match args.mode {
        Mode::List => {
            print_operations(args.json);
            return;
        }
        Mode::Run { kind, params } => (kind, params),
    };

    let trace_id = Uuid::new_v4().to_string();
    let config = match load_config(&trace_id) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("{err}; falling back to defaults");
            AppConfig::default()
        }
    };
    let log_level = if args.quiet {
        "warn"
    } else {
        config.logging.log_level.as_str()
    };
    init_logging_with_default(log_level);

    let mut summary = RunSummary {
        tool: "adb_panel_cli",
        status: "fail",
        trace_id: trace_id.clone(),
        operation: kind.to_string(),
        command_line: None,
        display: None,
        exit_code: None,
        elapsed_ms: None,
        error_code: None,
        error: None,
    };

    let panel = Panel::new(config.clone());
    if let Err(err) = panel.startup_check(&trace_id) {
        summary.error_code = Some(err.code);
        summary.error = Some(err.error);
        emit(&summary, args.json);
        std::process::exit(2);
    }

    let receipt = match panel.submit(kind, params, None, &trace_id) {
        Ok(receipt) => receipt,
        Err(err) => {
            summary.error_code = Some(err.code);
            summary.error = Some(err.error);
            emit(&summary, args.json);
            std::process::exit(1);
        }
    };
    summary.command_line = Some(receipt.command_line);

    let view = wait_for_completion(&panel, &config, !args.quiet && !args.json);
    summary.status = "pass";
    summary.display = Some(view.display);
    summary.exit_code = view.exit_code;
    summary.elapsed_ms = Some(view.elapsed_ms);
    emit(&summary, args.json);
}
