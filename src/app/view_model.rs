//! Responsible for transforming the `AppState` into a `UiState` view model.
//!
//! This is the presentation layer. It derives the tri-state of every tree node,
//! the selection counters and the size ranking, so the UI never computes them.

use serde::Serialize;

use super::state::AppState;
use crate::config::AppConfig;
use crate::core::ranking::files_by_size;
use crate::core::{ContextSerializer, SelectionSet, SelectionState, TreeEntry, TreeGenerator};
use crate::utils::format::format_bytes;

/// A serializable representation of the application state for the UI.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub config: AppConfig,
    pub root_dir: Option<String>,
    pub root_name: Option<String>,
    pub tree: Vec<UiTreeNode>,
    /// Number of paths in the selection, directories included.
    pub selected_count: usize,
    /// Number of selected files that will appear in the document.
    pub selected_file_count: usize,
    pub total_count: usize,
    pub summary: String,
    pub active_presets: Vec<String>,
    pub largest_files: Vec<UiRankedFile>,
    pub is_loading: bool,
    pub is_generating: bool,
    pub has_output: bool,
}

/// A serializable representation of a single node in the file tree for the UI.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UiTreeNode {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub selection_state: SelectionState,
    pub children: Vec<UiTreeNode>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UiRankedFile {
    pub path: String,
    pub size: u64,
    pub display_size: String,
}

/// Creates the complete `UiState` from the current `AppState`.
pub fn generate_ui_state(state: &AppState) -> UiState {
    let tree = if state.is_loading {
        Vec::new()
    } else {
        build_tree_nodes(&state.tree, &state.selection)
    };

    let largest_files = files_by_size(&state.tree, state.config.size_ranking_limit)
        .into_iter()
        .map(|file| UiRankedFile {
            display_size: format_bytes(file.size),
            path: file.path,
            size: file.size,
        })
        .collect();

    let mut active_presets: Vec<String> = state.active_presets.iter().cloned().collect();
    active_presets.sort();

    UiState {
        config: state.config.clone(),
        root_dir: state.root_dir.clone(),
        root_name: state
            .root_dir
            .as_deref()
            .map(|root| TreeGenerator::root_name(root).to_string()),
        tree,
        selected_count: state.selection.len(),
        selected_file_count: ContextSerializer::collect_selected_files(
            &state.tree,
            &state.selection,
        )
        .len(),
        total_count: SelectionSet::count_selectable(&state.tree),
        summary: state.summary.clone(),
        active_presets,
        largest_files,
        is_loading: state.is_loading,
        is_generating: state.is_generating,
        has_output: state.last_output.is_some(),
    }
}

/// Mirrors the tree, attaching the derived selection state to every node.
fn build_tree_nodes(entries: &[TreeEntry], selection: &SelectionSet) -> Vec<UiTreeNode> {
    entries
        .iter()
        .map(|entry| UiTreeNode {
            name: entry.name.clone(),
            path: entry.path.clone(),
            is_directory: entry.is_directory,
            size: entry.size.map(format_bytes),
            selection_state: selection.selection_state(entry),
            children: build_tree_nodes(&entry.children, selection),
        })
        .collect()
}
