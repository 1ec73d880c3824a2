//! Defines the central, mutable state of the application.

use std::collections::HashSet;
use tokio::task::JoinHandle;

use super::events::GeneratedContext;
use crate::config::AppConfig;
use crate::core::{SelectionSet, TreeEntry};

/// Holds the complete, mutable state of one directory session.
///
/// Wrapped in an `Arc<Mutex<...>>` and shared between the IPC handlers and the
/// generation task. The lock is never held across a host call.
pub struct AppState {
    /// The application's configuration settings.
    pub config: AppConfig,
    /// The directory the current tree was listed from.
    pub root_dir: Option<String>,
    pub tree: Vec<TreeEntry>,
    pub selection: SelectionSet,
    /// Free-form task description placed at the top of the document.
    pub summary: String,
    /// Ids of the presets whose files were added by `togglePreset`.
    pub active_presets: HashSet<String>,
    /// `true` while a directory request is waiting on the host.
    pub is_loading: bool,
    /// `true` while a generation is waiting on the host.
    pub is_generating: bool,
    /// Bumped every time a new directory is applied.
    pub session: u64,
    /// Bumped every time a directory request starts.
    pub directory_ticket: u64,
    /// The most recent generated document for this session.
    pub last_output: Option<GeneratedContext>,
    /// A handle to the running generation task, allowing it to be aborted.
    pub generation_task: Option<JoinHandle<()>>,
}

impl Default for AppState {
    /// Creates a default `AppState` instance, loading the configuration from disk.
    fn default() -> Self {
        Self::new(AppConfig::load().unwrap_or_default())
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            root_dir: None,
            tree: Vec::new(),
            selection: SelectionSet::default(),
            summary: String::new(),
            active_presets: HashSet::new(),
            is_loading: false,
            is_generating: false,
            session: 0,
            directory_ticket: 0,
            last_output: None,
            generation_task: None,
        }
    }

    /// Starts a directory request and returns its ticket.
    pub fn begin_directory_request(&mut self) -> u64 {
        self.directory_ticket += 1;
        self.is_loading = true;
        self.directory_ticket
    }

    /// Ends a directory request that produced no tree.
    ///
    /// Only the newest request may clear the loading flag.
    pub fn finish_directory_request(&mut self, ticket: u64) {
        if ticket == self.directory_ticket {
            self.is_loading = false;
        }
    }

    /// Installs a listed tree as a new session.
    ///
    /// Returns `false` and changes nothing when a newer request has started
    /// since `ticket` was issued.
    pub fn apply_directory(&mut self, ticket: u64, root: String, tree: Vec<TreeEntry>) -> bool {
        if ticket != self.directory_ticket {
            return false;
        }

        self.cancel_current_generation();
        self.root_dir = Some(root);
        self.tree = tree;
        self.selection = SelectionSet::clear();
        self.active_presets.clear();
        self.last_output = None;
        self.session += 1;
        self.is_loading = false;
        true
    }

    /// Whether a generation started in `session` for `root` may still publish.
    pub fn generation_is_current(&self, session: u64, root: &str) -> bool {
        self.session == session && self.root_dir.as_deref() == Some(root)
    }

    /// Cancels the current generation task, if any.
    pub fn cancel_current_generation(&mut self) {
        if let Some(handle) = self.generation_task.take() {
            handle.abort();
        }
        self.is_generating = false;
    }
}
