pub mod app;

#[cfg(feature = "gui")]
use app::commands::{
    default_paths, drain_results, list_operations, progress_tick, startup_check, submit_operation,
    tick_intervals,
};
#[cfg(feature = "gui")]
use app::config::{load_config, AppConfig};
#[cfg(feature = "gui")]
use app::logging::init_logging_with_default;
#[cfg(feature = "gui")]
use app::panel::Panel;
#[cfg(feature = "gui")]
use app::state::AppState;

#[cfg(feature = "gui")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::{WebviewUrl, WebviewWindowBuilder};
    use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
    use tracing::warn;

    let trace_id = uuid::Uuid::new_v4().to_string();
    let config = match load_config(&trace_id) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}; falling back to defaults");
            AppConfig::default()
        }
    };
    init_logging_with_default(&config.logging.log_level);

    let panel = Panel::new(config);
    let startup = panel.startup_check(&trace_id);

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(AppState::new(panel))
        .setup(move |app| {
            match startup {
                Ok(_) => {
                    WebviewWindowBuilder::new(app, "main", WebviewUrl::App("index.html".into()))
                        .title("ADB Panel")
                        .inner_size(960.0, 780.0)
                        .build()?;
                }
                Err(err) => {
                    warn!(trace_id = %err.trace_id, "exiting: {}", err.error);
                    let handle = app.handle().clone();
                    app.dialog()
                        .message(err.error)
                        .title("ADB Not Found")
                        .kind(MessageDialogKind::Error)
                        .show(move |_| handle.exit(2));
                }
            }
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            startup_check,
            list_operations,
            default_paths,
            tick_intervals,
            submit_operation,
            drain_results,
            progress_tick
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
