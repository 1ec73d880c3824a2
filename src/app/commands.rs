//! Contains all the command handlers that are callable from the frontend via IPC.
//!
//! Each function in this module corresponds to a specific `IpcMessage::command`.
//! Handlers mutate the `AppState`, call the host through [`HostServices`] when
//! they need the outside world, and report back to the UI through `UserEvent`s.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::events::{StatusMessage, UserEvent};
use super::helpers::{notify_state, send_status, with_state_and_notify};
use super::host::HostServices;
use super::proxy::EventProxy;
use super::state::AppState;
use super::tasks::{self, GenerationRequest, Tokenizer};
use crate::config::{settings, ContextOptions};
use crate::core::SelectionSet;

const NOTHING_TO_COPY: &str = "Nothing to copy yet. Generate the context first.";

/// Payload of `selectByExtensions`.
#[derive(Debug, Deserialize)]
pub struct ExtensionSelection {
    pub extensions: Vec<String>,
    #[serde(default = "default_add")]
    pub add: bool,
}

/// Payload of `selectByPatterns`.
#[derive(Debug, Deserialize)]
pub struct PatternSelection {
    pub patterns: Vec<String>,
    #[serde(default = "default_add")]
    pub add: bool,
}

fn default_add() -> bool {
    true
}

/// Which part of the last generated output `copyOutput` copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputPart {
    #[default]
    Document,
    FileMap,
    FileContents,
}

fn lock(state: &Arc<Mutex<AppState>>) -> std::sync::MutexGuard<'_, AppState> {
    state
        .lock()
        .expect("Mutex was poisoned. This should not happen.")
}

/// Sends the initial state to the UI.
pub fn initialize<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |_| {});
}

/// Asks the host for a directory, lists it, and installs it as a new session.
///
/// A cancelled dialog or a failed listing leaves the current session as it was.
pub async fn select_directory<H, P>(host: Arc<H>, proxy: P, state: Arc<Mutex<AppState>>)
where
    H: HostServices + ?Sized,
    P: EventProxy,
{
    let ticket = {
        let mut state_guard = lock(&state);
        let ticket = state_guard.begin_directory_request();
        notify_state(&state_guard, &proxy);
        ticket
    };

    let root = match host.choose_directory().await {
        Ok(Some(root)) => root,
        Ok(None) => {
            tracing::info!("User cancelled directory selection.");
            with_state_and_notify(&state, &proxy, |s| s.finish_directory_request(ticket));
            return;
        }
        Err(e) => {
            tracing::error!("Directory dialog failed: {:#}", e);
            with_state_and_notify(&state, &proxy, |s| s.finish_directory_request(ticket));
            send_status(
                &proxy,
                StatusMessage::error(format!("Failed to choose a directory: {e}")),
            );
            return;
        }
    };

    let listing = host.list_directory(&root).await;

    let mut state_guard = lock(&state);
    match listing {
        Ok(tree) => {
            let entry_count = SelectionSet::count_selectable(&tree);
            if !state_guard.apply_directory(ticket, root.clone(), tree) {
                tracing::warn!(
                    "Discarding listing for {} because a newer directory request started",
                    root
                );
                return;
            }
            tracing::info!("Loaded {} ({} entries)", root, entry_count);
            notify_state(&state_guard, &proxy);
            send_status(
                &proxy,
                StatusMessage::info(format!("Loaded {entry_count} entries.")),
            );
        }
        Err(e) => {
            tracing::error!("Listing {} failed: {:#}", root, e);
            state_guard.finish_directory_request(ticket);
            notify_state(&state_guard, &proxy);
            send_status(
                &proxy,
                StatusMessage::error(format!("Failed to load directory: {e}")),
            );
        }
    }
}

/// Toggles the path given as a JSON string, cascading through directories.
///
/// The click follows the state the checkbox shows, not the directory's own
/// membership.
pub fn toggle_selection<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let Some(path) = payload.as_str() else {
        tracing::warn!("toggleSelection expects a path string, got {}", payload);
        return;
    };
    with_state_and_notify(&state, &proxy, |s| {
        s.selection.toggle_displayed(&s.tree, path);
    });
}

pub fn select_all<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        s.selection = SelectionSet::select_all(&s.tree);
    });
}

pub fn deselect_all<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        s.selection = SelectionSet::clear();
        s.active_presets.clear();
    });
}

/// Adds or removes every file matching the given extension patterns.
pub fn select_by_extensions<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let request: ExtensionSelection = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Invalid selectByExtensions payload: {}", e);
            send_status(&proxy, StatusMessage::error("Invalid extension selection."));
            return;
        }
    };
    with_state_and_notify(&state, &proxy, |s| {
        let changed = s
            .selection
            .select_by_extensions(&s.tree, &request.extensions, request.add);
        tracing::debug!("Extension selection changed {} files", changed);
    });
}

/// Adds or removes every file matching the given gitignore-style patterns.
pub fn select_by_patterns<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let request: PatternSelection = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Invalid selectByPatterns payload: {}", e);
            send_status(&proxy, StatusMessage::error("Invalid pattern selection."));
            return;
        }
    };
    with_state_and_notify(&state, &proxy, |s| {
        let changed = s.selection.select_by_patterns(
            &s.tree,
            s.root_dir.as_deref(),
            &request.patterns,
            request.add,
        );
        tracing::debug!("Pattern selection changed {} files", changed);
    });
}

/// Activates a preset by adding its files, or deactivates it by removing them.
pub fn toggle_preset<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let Some(id) = payload.as_str() else {
        tracing::warn!("togglePreset expects a preset id, got {}", payload);
        return;
    };

    let mut state_guard = lock(&state);
    let Some(preset) = state_guard.config.preset(id).cloned() else {
        drop(state_guard);
        send_status(&proxy, StatusMessage::error(format!("Unknown preset '{id}'.")));
        return;
    };

    let s = &mut *state_guard;
    let activate = !s.active_presets.contains(id);
    let changed = s
        .selection
        .select_by_extensions(&s.tree, &preset.extensions, activate);
    if activate {
        s.active_presets.insert(preset.id.clone());
    } else {
        s.active_presets.remove(id);
    }
    tracing::info!(
        "Preset '{}' {} ({} files changed)",
        preset.id,
        if activate { "activated" } else { "deactivated" },
        changed
    );
    notify_state(&state_guard, &proxy);
}

/// Deactivates every active preset, removing the files they added.
pub fn clear_presets<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        for id in std::mem::take(&mut s.active_presets) {
            if let Some(preset) = s.config.preset(&id) {
                s.selection
                    .select_by_extensions(&s.tree, &preset.extensions, false);
            }
        }
    });
}

pub fn update_summary<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let summary = payload.as_str().unwrap_or_default().to_string();
    with_state_and_notify(&state, &proxy, |s| s.summary = summary);
}

/// Replaces the optional document sections.
pub fn update_options<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    match serde_json::from_value::<ContextOptions>(payload) {
        Ok(options) => with_state_and_notify(&state, &proxy, |s| s.config.context = options),
        Err(e) => {
            tracing::warn!("Invalid updateOptions payload: {}", e);
            send_status(&proxy, StatusMessage::error("Invalid context options."));
        }
    }
}

/// Validates the session and spawns the generation task.
///
/// Validation failures are reported before any host call is made.
pub fn generate_context<H, P, T>(
    host: Arc<H>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
    tokenizer: T,
) where
    H: HostServices + ?Sized + 'static,
    P: EventProxy,
    T: Tokenizer,
{
    let mut state_guard = lock(&state);
    let request = match GenerationRequest::capture(&state_guard) {
        Ok(request) => request,
        Err(e) => {
            tracing::info!("Generation rejected: {}", e);
            drop(state_guard);
            send_status(&proxy, StatusMessage::error(e.to_string()));
            return;
        }
    };

    state_guard.cancel_current_generation();
    state_guard.is_generating = true;
    notify_state(&state_guard, &proxy);

    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        tasks::generation_task(host, proxy, task_state, request, tokenizer).await;
    });
    state_guard.generation_task = Some(handle);
}

/// Copies a part of the last generated output to the clipboard.
pub async fn copy_output<H, P>(
    host: Arc<H>,
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) where
    H: HostServices + ?Sized,
    P: EventProxy,
{
    let part = if payload.is_null() {
        OutputPart::default()
    } else {
        serde_json::from_value(payload).unwrap_or_else(|e| {
            tracing::warn!("Unknown copyOutput part, copying the document: {}", e);
            OutputPart::default()
        })
    };

    let text = {
        let state_guard = lock(&state);
        state_guard.last_output.as_ref().map(|output| match part {
            OutputPart::Document => output.document.clone(),
            OutputPart::FileMap => output.file_map.clone(),
            OutputPart::FileContents => output.file_contents.clone(),
        })
    };

    match text {
        Some(text) => tasks::copy_with_status(host.as_ref(), &proxy, &text).await,
        None => {
            proxy.send_event(UserEvent::CopyComplete(false));
            send_status(&proxy, StatusMessage::error(NOTHING_TO_COPY));
        }
    }
}

/// Loads a configuration file from the path in the payload and applies it.
pub fn import_config<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let Some(path) = payload.as_str().map(PathBuf::from) else {
        tracing::warn!("importConfig expects a file path, got {}", payload);
        return;
    };

    match settings::import_config(&path) {
        Ok(config) => {
            with_state_and_notify(&state, &proxy, |s| {
                s.config = config;
                s.active_presets.clear();
            });
            send_status(&proxy, StatusMessage::success("Configuration imported."));
        }
        Err(e) => {
            tracing::error!("Failed to import config: {:#}", e);
            send_status(
                &proxy,
                StatusMessage::error(format!("Failed to import config: {e:#}")),
            );
        }
    }
}

/// Writes the current configuration to the path in the payload.
pub fn export_config<P: EventProxy>(
    payload: serde_json::Value,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let Some(path) = payload.as_str().map(PathBuf::from) else {
        tracing::warn!("exportConfig expects a file path, got {}", payload);
        proxy.send_event(UserEvent::ConfigExported(false));
        return;
    };

    let config = lock(&state).config.clone();
    match settings::export_config(&config, &path) {
        Ok(()) => proxy.send_event(UserEvent::ConfigExported(true)),
        Err(e) => {
            tracing::error!("Failed to export config: {:#}", e);
            proxy.send_event(UserEvent::ConfigExported(false));
            send_status(
                &proxy,
                StatusMessage::error(format!("Failed to export config: {e:#}")),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::{GeneratedContext, StatusLevel};
    use crate::app::view_model::UiState;
    use crate::config::AppConfig;
    use crate::core::{FileContentResult, SelectionState, TreeEntry};
    use crate::utils::test_helpers::setup_test_logging;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::tempdir;
    use tokio::sync::{mpsc, Notify};

    // A mock host that serves canned trees and file contents.
    #[derive(Default)]
    struct MockHost {
        chosen: Mutex<Option<String>>,
        trees: Mutex<HashMap<String, Vec<TreeEntry>>>,
        contents: Mutex<HashMap<String, FileContentResult>>,
        fail_listing: Mutex<bool>,
        fetch_calls: Mutex<Vec<Vec<String>>>,
        clipboard: Mutex<Vec<String>>,
        fetch_gate: Option<Arc<Notify>>,
    }

    impl MockHost {
        fn choose(&self, root: Option<&str>) {
            *self.chosen.lock().unwrap() = root.map(String::from);
        }

        fn add_tree(&self, root: &str, tree: Vec<TreeEntry>) {
            self.trees.lock().unwrap().insert(root.to_string(), tree);
        }

        fn add_text(&self, path: &str, content: &str) {
            self.contents
                .lock()
                .unwrap()
                .insert(path.to_string(), FileContentResult::text(path, content));
        }

        fn fetch_count(&self) -> usize {
            self.fetch_calls.lock().unwrap().len()
        }

        fn clipboard(&self) -> Vec<String> {
            self.clipboard.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HostServices for MockHost {
        async fn choose_directory(&self) -> Result<Option<String>> {
            Ok(self.chosen.lock().unwrap().clone())
        }

        async fn list_directory(&self, root: &str) -> Result<Vec<TreeEntry>> {
            if *self.fail_listing.lock().unwrap() {
                return Err(anyhow!("permission denied"));
            }
            self.trees
                .lock()
                .unwrap()
                .get(root)
                .cloned()
                .ok_or_else(|| anyhow!("no such directory: {root}"))
        }

        async fn fetch_file_contents(
            &self,
            _root: &str,
            paths: &[String],
        ) -> Result<Vec<FileContentResult>> {
            self.fetch_calls.lock().unwrap().push(paths.to_vec());
            if let Some(gate) = &self.fetch_gate {
                gate.notified().await;
            }
            let contents = self.contents.lock().unwrap();
            Ok(paths
                .iter()
                .rev()
                .filter_map(|path| contents.get(path).cloned())
                .collect())
        }

        async fn copy_to_clipboard(&self, text: &str) -> Result<()> {
            self.clipboard.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct FixedTokenizer;

    impl Tokenizer for FixedTokenizer {
        fn count_tokens(&self, text: &str) -> Option<usize> {
            Some(text.split_whitespace().count())
        }
    }

    struct TestHarness {
        state: Arc<Mutex<AppState>>,
        proxy: mpsc::UnboundedSender<UserEvent>,
        event_rx: mpsc::UnboundedReceiver<UserEvent>,
        host: Arc<MockHost>,
    }

    impl TestHarness {
        fn new() -> Self {
            Self::with_host(MockHost::default())
        }

        fn with_host(host: MockHost) -> Self {
            setup_test_logging();
            let (tx, rx) = mpsc::unbounded_channel();
            let mut config = AppConfig::default();
            config.copy_on_generate = false;
            host.add_tree(
                "/work/shop",
                vec![
                    TreeEntry::directory(
                        "src",
                        "src",
                        vec![
                            TreeEntry::file("a.ts", "src/a.ts", Some(10)),
                            TreeEntry::file("b.ts", "src/b.ts", Some(20)),
                        ],
                    ),
                    TreeEntry::file("README.md", "README.md", Some(5)),
                ],
            );
            host.add_text("src/a.ts", "export const a = 1;");
            host.add_text("src/b.ts", "export const b = 2;");
            host.add_text("README.md", "# Shop");

            Self {
                state: Arc::new(Mutex::new(AppState::new(config))),
                proxy: tx,
                event_rx: rx,
                host: Arc::new(host),
            }
        }

        async fn load_shop(&mut self) {
            self.host.choose(Some("/work/shop"));
            select_directory(self.host.clone(), self.proxy.clone(), self.state.clone()).await;
            self.drain();
        }

        fn drain(&mut self) -> Vec<UserEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.event_rx.try_recv() {
                events.push(event);
            }
            events
        }

        fn last_state_update(&mut self) -> Option<Box<UiState>> {
            self.drain().into_iter().rev().find_map(|event| match event {
                UserEvent::StateUpdate(ui_state) => Some(ui_state),
                _ => None,
            })
        }

        async fn next_event(&mut self) -> Option<UserEvent> {
            tokio::time::timeout(std::time::Duration::from_secs(2), self.event_rx.recv())
                .await
                .ok()
                .flatten()
        }

        async fn wait_for_generated(&mut self) -> Option<Box<GeneratedContext>> {
            while let Some(event) = self.next_event().await {
                if let UserEvent::ShowGeneratedContent(generated) = event {
                    return Some(generated);
                }
            }
            None
        }

        fn statuses(events: &[UserEvent]) -> Vec<(StatusLevel, String)> {
            events
                .iter()
                .filter_map(|event| match event {
                    UserEvent::ShowStatus(status) => Some((status.level, status.text.clone())),
                    _ => None,
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn test_initialize_sends_initial_state() {
        let mut harness = TestHarness::new();
        initialize(harness.proxy.clone(), harness.state.clone());
        let ui = harness.last_state_update().unwrap();
        assert!(ui.root_dir.is_none());
        assert_eq!(ui.total_count, 0);
    }

    #[tokio::test]
    async fn test_select_directory_installs_tree() {
        let mut harness = TestHarness::new();
        harness.host.choose(Some("/work/shop"));

        select_directory(harness.host.clone(), harness.proxy.clone(), harness.state.clone())
            .await;

        let events = harness.drain();
        let loading = events
            .iter()
            .find_map(|event| match event {
                UserEvent::StateUpdate(ui) => Some(ui.is_loading),
                _ => None,
            })
            .unwrap();
        assert!(loading);

        let state = harness.state.lock().unwrap();
        assert_eq!(state.root_dir.as_deref(), Some("/work/shop"));
        assert_eq!(state.tree.len(), 2);
        assert_eq!(state.session, 1);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_cancelled_dialog_keeps_session() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;
        harness.host.choose(None);

        select_directory(harness.host.clone(), harness.proxy.clone(), harness.state.clone())
            .await;

        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.root_dir.as_deref(), Some("/work/shop"));
        assert!(!ui.is_loading);
    }

    #[tokio::test]
    async fn test_listing_failure_keeps_session_and_reports() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;
        toggle_selection(json!("src/a.ts"), harness.proxy.clone(), harness.state.clone());
        harness.drain();

        *harness.host.fail_listing.lock().unwrap() = true;
        harness.host.choose(Some("/work/other"));
        select_directory(harness.host.clone(), harness.proxy.clone(), harness.state.clone())
            .await;

        let events = harness.drain();
        let statuses = TestHarness::statuses(&events);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].0, StatusLevel::Error);
        assert!(statuses[0].1.contains("permission denied"));

        let state = harness.state.lock().unwrap();
        assert_eq!(state.root_dir.as_deref(), Some("/work/shop"));
        assert!(state.selection.is_selected("src/a.ts"));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_toggle_directory_then_file() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;

        toggle_selection(json!("src"), harness.proxy.clone(), harness.state.clone());
        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.selected_count, 3);
        assert_eq!(ui.tree[0].selection_state, SelectionState::Selected);

        toggle_selection(json!("src/a.ts"), harness.proxy.clone(), harness.state.clone());
        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.selected_count, 2);
        assert_eq!(ui.tree[0].selection_state, SelectionState::Partial);
        assert_eq!(ui.selected_file_count, 1);
    }

    #[tokio::test]
    async fn test_select_all_and_deselect_all() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;

        select_all(harness.proxy.clone(), harness.state.clone());
        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.selected_count, ui.total_count);

        deselect_all(harness.proxy.clone(), harness.state.clone());
        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.selected_count, 0);
    }

    #[tokio::test]
    async fn test_extension_and_pattern_selection() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;

        select_by_extensions(
            json!({"extensions": [".md"]}),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        assert_eq!(harness.last_state_update().unwrap().selected_file_count, 1);

        select_by_patterns(
            json!({"patterns": ["src/"], "add": true}),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        assert_eq!(harness.last_state_update().unwrap().selected_file_count, 3);

        select_by_patterns(
            json!({"patterns": ["*.ts"], "add": false}),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        assert_eq!(harness.last_state_update().unwrap().selected_file_count, 1);
    }

    #[tokio::test]
    async fn test_pattern_selection_on_absolute_entry_paths() {
        let mut harness = TestHarness::new();
        harness.host.add_tree(
            "/home/dev/proj",
            vec![TreeEntry::directory(
                "src",
                "/home/dev/proj/src",
                vec![TreeEntry::file("a.ts", "/home/dev/proj/src/a.ts", Some(3))],
            )],
        );
        harness.host.choose(Some("/home/dev/proj"));
        select_directory(harness.host.clone(), harness.proxy.clone(), harness.state.clone())
            .await;
        harness.drain();

        select_by_patterns(
            json!({"patterns": ["*.ts"]}),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        assert_eq!(harness.last_state_update().unwrap().selected_file_count, 1);

        // The session keeps serving commands afterwards.
        deselect_all(harness.proxy.clone(), harness.state.clone());
        assert_eq!(harness.last_state_update().unwrap().selected_count, 0);
    }

    #[tokio::test]
    async fn test_toggle_selection_follows_displayed_directory_state() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;

        select_by_extensions(
            json!({"extensions": [".ts"]}),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.tree[0].selection_state, SelectionState::Selected);

        toggle_selection(json!("src"), harness.proxy.clone(), harness.state.clone());
        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.tree[0].selection_state, SelectionState::Unselected);
        assert_eq!(ui.selected_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_extension_payload_reports_error() {
        let mut harness = TestHarness::new();
        select_by_extensions(json!("nope"), harness.proxy.clone(), harness.state.clone());
        let statuses = TestHarness::statuses(&harness.drain());
        assert_eq!(statuses[0].0, StatusLevel::Error);
    }

    #[tokio::test]
    async fn test_toggle_preset_adds_then_removes() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;

        toggle_preset(json!("frontend"), harness.proxy.clone(), harness.state.clone());
        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.active_presets, vec!["frontend"]);
        assert_eq!(ui.selected_file_count, 2);

        toggle_preset(json!("frontend"), harness.proxy.clone(), harness.state.clone());
        let ui = harness.last_state_update().unwrap();
        assert!(ui.active_presets.is_empty());
        assert_eq!(ui.selected_file_count, 0);
    }

    #[tokio::test]
    async fn test_clear_presets_removes_preset_files_only() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;

        toggle_preset(json!("docs"), harness.proxy.clone(), harness.state.clone());
        toggle_selection(json!("src/a.ts"), harness.proxy.clone(), harness.state.clone());
        clear_presets(harness.proxy.clone(), harness.state.clone());

        let ui = harness.last_state_update().unwrap();
        assert!(ui.active_presets.is_empty());
        assert_eq!(ui.selected_file_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_preset_reports_error() {
        let mut harness = TestHarness::new();
        toggle_preset(json!("kotlin"), harness.proxy.clone(), harness.state.clone());
        let statuses = TestHarness::statuses(&harness.drain());
        assert_eq!(statuses, vec![(StatusLevel::Error, "Unknown preset 'kotlin'.".to_string())]);
    }

    #[tokio::test]
    async fn test_generate_without_selection_never_fetches() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;

        generate_context(
            harness.host.clone(),
            harness.proxy.clone(),
            harness.state.clone(),
            FixedTokenizer,
        );

        let statuses = TestHarness::statuses(&harness.drain());
        assert_eq!(
            statuses,
            vec![(
                StatusLevel::Error,
                "Please select some files or folders first.".to_string()
            )]
        );
        assert_eq!(harness.host.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_without_directory_never_fetches() {
        let mut harness = TestHarness::new();
        generate_context(
            harness.host.clone(),
            harness.proxy.clone(),
            harness.state.clone(),
            FixedTokenizer,
        );
        let statuses = TestHarness::statuses(&harness.drain());
        assert_eq!(statuses[0].1, "Please select a project directory first.");
        assert_eq!(harness.host.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_context_publishes_document() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;
        update_summary(json!("Fix the totals."), harness.proxy.clone(), harness.state.clone());
        toggle_selection(json!("src"), harness.proxy.clone(), harness.state.clone());
        harness.drain();

        generate_context(
            harness.host.clone(),
            harness.proxy.clone(),
            harness.state.clone(),
            FixedTokenizer,
        );
        let generated = harness.wait_for_generated().await.unwrap();

        assert!(generated.document.starts_with("<prompt>\n<summary>\nFix the totals.\n</summary>"));
        assert!(generated
            .document
            .contains("<project_overview file=\"README.md\">\n# Shop\n</project_overview>"));
        assert!(generated
            .file_contents
            .contains("File: src/a.ts\n```typescript\nexport const a = 1;\n```"));
        assert!(generated.file_map.starts_with("<file_map>\nshop/\n"));
        assert_eq!(generated.file_count, 2);
        assert_eq!(generated.byte_count, generated.document.len());
        assert!(generated.token_count.unwrap() > 0);

        let calls = harness.host.fetch_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![vec!["src/a.ts", "src/b.ts", "README.md"]]);

        let state = harness.state.lock().unwrap();
        assert!(!state.is_generating);
        assert!(state.last_output.is_some());
        assert!(harness.host.clipboard().is_empty());
    }

    #[tokio::test]
    async fn test_assembly_failure_clears_generating_flag() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;
        toggle_selection(json!("README.md"), harness.proxy.clone(), harness.state.clone());
        let mut request = {
            let mut state = harness.state.lock().unwrap();
            state.is_generating = true;
            GenerationRequest::capture(&state).unwrap()
        };
        // The selection empties after capture, so assembly rejects the request.
        request.selection = SelectionSet::clear();
        harness.drain();

        tasks::generation_task(
            harness.host.clone(),
            harness.proxy.clone(),
            harness.state.clone(),
            request,
            FixedTokenizer,
        )
        .await;

        let events = harness.drain();
        let statuses = TestHarness::statuses(&events);
        assert_eq!(
            statuses,
            vec![(
                StatusLevel::Error,
                "Please select some files or folders first.".to_string()
            )]
        );
        assert!(!events
            .iter()
            .any(|event| matches!(event, UserEvent::ShowGeneratedContent(_))));
        let state = harness.state.lock().unwrap();
        assert!(!state.is_generating);
        assert!(state.last_output.is_none());
    }

    #[tokio::test]
    async fn test_generate_copies_when_configured() {
        let mut harness = TestHarness::new();
        harness.load_shop().await;
        harness.state.lock().unwrap().config.copy_on_generate = true;
        toggle_selection(json!("README.md"), harness.proxy.clone(), harness.state.clone());

        generate_context(
            harness.host.clone(),
            harness.proxy.clone(),
            harness.state.clone(),
            FixedTokenizer,
        );
        let generated = harness.wait_for_generated().await.unwrap();

        let mut copied = None;
        while let Some(event) = harness.next_event().await {
            if let UserEvent::CopyComplete(ok) = event {
                copied = Some(ok);
                break;
            }
        }
        assert_eq!(copied, Some(true));
        assert_eq!(harness.host.clipboard(), vec![generated.document.clone()]);
    }

    #[tokio::test]
    async fn test_stale_generation_results_are_discarded() {
        let gate = Arc::new(Notify::new());
        let host = MockHost {
            fetch_gate: Some(gate.clone()),
            ..MockHost::default()
        };
        let mut harness = TestHarness::with_host(host);
        harness.load_shop().await;
        toggle_selection(json!("src/a.ts"), harness.proxy.clone(), harness.state.clone());

        let request = GenerationRequest::capture(&harness.state.lock().unwrap()).unwrap();
        let task = tokio::spawn(tasks::generation_task(
            harness.host.clone(),
            harness.proxy.clone(),
            harness.state.clone(),
            request,
            FixedTokenizer,
        ));

        // Replace the session while the fetch is still outstanding.
        harness.host.choose(Some("/work/shop"));
        select_directory(harness.host.clone(), harness.proxy.clone(), harness.state.clone())
            .await;
        harness.drain();

        gate.notify_one();
        task.await.unwrap();

        let events = harness.drain();
        assert!(!events
            .iter()
            .any(|event| matches!(event, UserEvent::ShowGeneratedContent(_))));
        assert!(harness.state.lock().unwrap().last_output.is_none());
    }

    #[tokio::test]
    async fn test_copy_output_parts() {
        let mut harness = TestHarness::new();

        copy_output(
            harness.host.clone(),
            serde_json::Value::Null,
            harness.proxy.clone(),
            harness.state.clone(),
        )
        .await;
        let events = harness.drain();
        assert!(matches!(events[0], UserEvent::CopyComplete(false)));
        assert_eq!(TestHarness::statuses(&events)[0].1, NOTHING_TO_COPY);

        harness.state.lock().unwrap().last_output = Some(GeneratedContext {
            document: "doc".into(),
            file_map: "map".into(),
            file_contents: "contents".into(),
            file_count: 1,
            byte_count: 3,
            line_count: 1,
            token_count: None,
        });
        copy_output(
            harness.host.clone(),
            json!("fileMap"),
            harness.proxy.clone(),
            harness.state.clone(),
        )
        .await;
        assert_eq!(harness.host.clipboard(), vec!["map"]);
    }

    #[tokio::test]
    async fn test_update_options_applies_and_rejects() {
        let mut harness = TestHarness::new();
        update_options(
            json!({"includeGitignore": true, "unifiedPrompt": false}),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        let ui = harness.last_state_update().unwrap();
        assert!(ui.config.context.include_gitignore);
        assert!(!ui.config.context.unified_prompt);

        update_options(json!([1, 2]), harness.proxy.clone(), harness.state.clone());
        let statuses = TestHarness::statuses(&harness.drain());
        assert_eq!(statuses[0].0, StatusLevel::Error);
    }

    #[tokio::test]
    async fn test_export_then_import_config() {
        let mut harness = TestHarness::new();
        let dir = tempdir().unwrap();
        let path = dir.path().join("context-builder.json");

        harness.state.lock().unwrap().config.size_ranking_limit = 3;
        export_config(
            json!(path.to_string_lossy()),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        assert!(matches!(
            harness.next_event().await,
            Some(UserEvent::ConfigExported(true))
        ));

        harness.state.lock().unwrap().config = AppConfig::default();
        import_config(
            json!(path.to_string_lossy()),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        let ui = harness.last_state_update().unwrap();
        assert_eq!(ui.config.size_ranking_limit, 3);
    }

    #[tokio::test]
    async fn test_import_corrupt_config_keeps_current() {
        let mut harness = TestHarness::new();
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();

        import_config(
            json!(path.to_string_lossy()),
            harness.proxy.clone(),
            harness.state.clone(),
        );
        let statuses = TestHarness::statuses(&harness.drain());
        assert_eq!(statuses[0].0, StatusLevel::Error);
        assert!(!harness.state.lock().unwrap().config.copy_on_generate);
    }
}
