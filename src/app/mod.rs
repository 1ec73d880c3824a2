//! The session controller: owns one directory session and serves UI commands.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod host;
pub mod proxy;
pub mod state;
pub mod tasks;
pub mod view_model;

use std::sync::{Arc, Mutex};

use events::IpcMessage;
use host::HostServices;
use proxy::EventProxy;
use state::AppState;
use tasks::RealTokenizer;

/// Entry point for raw IPC messages from the UI.
///
/// Parses the message and runs the command on the tokio runtime, so the
/// caller never blocks on host calls.
pub fn handle_ipc_message<H, P>(
    message: String,
    host: Arc<H>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) where
    H: HostServices + ?Sized + 'static,
    P: EventProxy,
{
    match serde_json::from_str::<IpcMessage>(&message) {
        Ok(msg) => {
            tokio::spawn(async move {
                dispatch_command(msg, host, proxy, state).await;
            });
        }
        Err(e) => tracing::error!("Failed to parse IPC message: {}. Message: {}", e, message),
    }
}

/// Runs a single parsed command to completion.
///
/// `generateContext` returns once the generation task is spawned; its result
/// arrives later as a `ShowGeneratedContent` event.
pub async fn dispatch_command<H, P>(
    msg: IpcMessage,
    host: Arc<H>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) where
    H: HostServices + ?Sized + 'static,
    P: EventProxy,
{
    tracing::debug!("IPC command received: {}", msg.command);
    match msg.command.as_str() {
        "initialize" => commands::initialize(proxy, state),
        "selectDirectory" => commands::select_directory(host, proxy, state).await,
        "toggleSelection" => commands::toggle_selection(msg.payload, proxy, state),
        "selectAll" => commands::select_all(proxy, state),
        "deselectAll" => commands::deselect_all(proxy, state),
        "selectByExtensions" => commands::select_by_extensions(msg.payload, proxy, state),
        "selectByPatterns" => commands::select_by_patterns(msg.payload, proxy, state),
        "togglePreset" => commands::toggle_preset(msg.payload, proxy, state),
        "clearPresets" => commands::clear_presets(proxy, state),
        "updateSummary" => commands::update_summary(msg.payload, proxy, state),
        "updateOptions" => commands::update_options(msg.payload, proxy, state),
        "generateContext" => commands::generate_context(host, proxy, state, RealTokenizer),
        "copyOutput" => commands::copy_output(host, msg.payload, proxy, state).await,
        "importConfig" => commands::import_config(msg.payload, proxy, state),
        "exportConfig" => commands::export_config(msg.payload, proxy, state),
        _ => tracing::warn!("Unknown IPC command: {}", msg.command),
    }
}
