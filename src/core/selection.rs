//! The selection engine: which tree paths are selected, and how toggles cascade.
//!
//! Only explicit membership is stored. A directory's checkbox state in the UI is
//! always derived from its children on read, so it can never go stale when a
//! descendant changes.

use ignore::gitignore::GitignoreBuilder;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use super::model::{find_entry, walk_tree, TreeEntry};
use super::presets::matches_extensions;

/// The derived tri-state of an entry as displayed in the tree view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionState {
    Selected,
    Unselected,
    Partial,
}

/// The set of currently selected paths for one directory session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    paths: HashSet<String>,
}

impl SelectionSet {
    /// Returns the empty selection.
    pub fn clear() -> Self {
        Self::default()
    }

    /// Returns a selection containing every path reachable from `tree`.
    pub fn select_all(tree: &[TreeEntry]) -> Self {
        let mut selection = Self::default();
        walk_tree(tree, |entry| {
            selection.paths.insert(entry.path.clone());
        });
        selection
    }

    /// Total number of paths in `tree`, for "selected N / M" displays.
    pub fn count_selectable(tree: &[TreeEntry]) -> usize {
        let mut count = 0;
        walk_tree(tree, |_| count += 1);
        count
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Flips the membership of `entry`, cascading to every descendant of a directory.
    ///
    /// Ancestors are never touched: their displayed state is recomputed from
    /// their children by [`SelectionSet::selection_state`].
    pub fn toggle(&mut self, entry: &TreeEntry) {
        let select = !self.paths.contains(&entry.path);
        self.set_subtree(entry, select);
    }

    /// Resolves `path` in `tree` and toggles it.
    ///
    /// Returns `false` without changing anything when the path is not part of the tree.
    pub fn toggle_path(&mut self, tree: &[TreeEntry], path: &str) -> bool {
        match find_entry(tree, path) {
            Some(entry) => {
                self.toggle(entry);
                true
            }
            None => {
                tracing::warn!("Ignoring toggle for path not in the current tree: {}", path);
                false
            }
        }
    }

    /// Toggles `path` the way its checkbox reads in the tree view.
    ///
    /// An entry shown as `Selected` is deselected with its whole subtree; anything
    /// else is selected with its subtree. This keeps a click and the displayed
    /// state in agreement when a directory's own membership and the state
    /// derived from its children differ.
    pub fn toggle_displayed(&mut self, tree: &[TreeEntry], path: &str) -> bool {
        match find_entry(tree, path) {
            Some(entry) => {
                let select = self.selection_state(entry) != SelectionState::Selected;
                self.set_subtree(entry, select);
                true
            }
            None => {
                tracing::warn!("Ignoring toggle for path not in the current tree: {}", path);
                false
            }
        }
    }

    /// `true` iff some but not all of a directory's direct children are selected.
    ///
    /// Files and directories without children are never indeterminate.
    pub fn is_indeterminate(&self, entry: &TreeEntry) -> bool {
        if !entry.is_directory || entry.children.is_empty() {
            return false;
        }
        let selected = entry
            .children
            .iter()
            .filter(|child| self.paths.contains(&child.path))
            .count();
        selected > 0 && selected < entry.children.len()
    }

    /// Computes the tri-state shown for `entry`.
    pub fn selection_state(&self, entry: &TreeEntry) -> SelectionState {
        if !entry.is_directory || entry.children.is_empty() {
            return if self.paths.contains(&entry.path) {
                SelectionState::Selected
            } else {
                SelectionState::Unselected
            };
        }

        if self.is_indeterminate(entry) {
            return SelectionState::Partial;
        }

        let mut all_selected = true;
        for child in &entry.children {
            match self.selection_state(child) {
                SelectionState::Partial => return SelectionState::Partial,
                SelectionState::Unselected => all_selected = false,
                SelectionState::Selected => {}
            }
        }

        if all_selected {
            SelectionState::Selected
        } else {
            SelectionState::Unselected
        }
    }

    /// Adds or removes every file whose name matches one of `extensions`.
    ///
    /// Returns the number of files whose membership changed.
    pub fn select_by_extensions(
        &mut self,
        tree: &[TreeEntry],
        extensions: &[String],
        add: bool,
    ) -> usize {
        let mut changed = 0;
        walk_tree(tree, |entry| {
            if !entry.is_directory && matches_extensions(&entry.name, extensions) {
                changed += usize::from(self.set_path(&entry.path, add));
            }
        });
        changed
    }

    /// Adds or removes every file matched by gitignore-style `patterns`.
    ///
    /// Patterns are evaluated relative to `root_dir`, so a directory pattern such
    /// as `src/` matches every file below it. Entry paths under `root_dir` are
    /// matched by their remainder, other relative paths as given, and absolute
    /// paths outside the root never match. Invalid patterns are skipped with a
    /// warning. Returns the number of files whose membership changed.
    pub fn select_by_patterns(
        &mut self,
        tree: &[TreeEntry],
        root_dir: Option<&str>,
        patterns: &[String],
        add: bool,
    ) -> usize {
        let root = Path::new(root_dir.unwrap_or("."));
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            let trimmed = pattern.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Err(e) = builder.add_line(None, trimmed) {
                tracing::warn!("Skipping invalid selection pattern '{}': {}", trimmed, e);
            }
        }

        let matcher = match builder.build() {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::error!("Failed to build selection pattern matcher: {}", e);
                return 0;
            }
        };

        let mut changed = 0;
        walk_tree(tree, |entry| {
            if entry.is_directory {
                return;
            }
            let Some(relative) = relative_to_root(root, &entry.path) else {
                tracing::debug!("Pattern selection skips path outside the root: {}", entry.path);
                return;
            };
            if matcher
                .matched_path_or_any_parents(relative, false)
                .is_ignore()
            {
                changed += usize::from(self.set_path(&entry.path, add));
            }
        });
        changed
    }

    fn set_subtree(&mut self, entry: &TreeEntry, select: bool) {
        entry.walk(&mut |node: &TreeEntry| {
            self.set_path(&node.path, select);
        });
    }

    fn set_path(&mut self, path: &str, select: bool) -> bool {
        if select {
            self.paths.insert(path.to_string())
        } else {
            self.paths.remove(path)
        }
    }
}

/// The part of `path` below `root`, or `path` itself when it is relative.
///
/// `None` for rooted paths outside `root` and for the root itself.
fn relative_to_root<'a>(root: &Path, path: &'a str) -> Option<&'a Path> {
    let path = Path::new(path);
    let relative = match path.strip_prefix(root) {
        Ok(rest) => rest,
        Err(_) if !path.has_root() => path,
        Err(_) => return None,
    };
    (!relative.as_os_str().is_empty()).then_some(relative)
}

impl<S: Into<String>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}
