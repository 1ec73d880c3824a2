//! The tree and content types exchanged with the host runtime.

use serde::{Deserialize, Serialize};

/// A node in a directory tree as produced by the host's enumeration.
///
/// The host delivers the whole tree at once when a directory is chosen.
/// Children are kept in the order the host provided; nothing in this crate
/// re-sorts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry {
    pub name: String,
    /// Unique identifier within the tree, used as the selection key.
    pub path: String,
    #[serde(alias = "isDir")]
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeEntry>,
}

impl TreeEntry {
    /// Creates a file entry.
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            size,
            children: Vec::new(),
        }
    }

    /// Creates a directory entry with the given children.
    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<TreeEntry>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            size: None,
            children,
        }
    }

    /// Visits this entry and all of its descendants in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TreeEntry)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Visits every entry of a forest in pre-order.
pub fn walk_tree<'a>(tree: &'a [TreeEntry], mut visit: impl FnMut(&'a TreeEntry)) {
    for entry in tree {
        entry.walk(&mut visit);
    }
}

/// Finds the entry with the given path anywhere in the forest.
pub fn find_entry<'a>(tree: &'a [TreeEntry], path: &str) -> Option<&'a TreeEntry> {
    for entry in tree {
        if entry.path == path {
            return Some(entry);
        }
        if let Some(found) = find_entry(&entry.children, path) {
            return Some(found);
        }
    }
    None
}

/// The per-file outcome of a content fetch, produced entirely by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContentResult {
    pub path: String,
    /// The text content, or a placeholder line when `is_binary` is set.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_binary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileContentResult {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            is_binary: false,
            error: None,
        }
    }

    pub fn binary(path: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: placeholder.into(),
            is_binary: true,
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: String::new(),
            is_binary: false,
            error: Some(error.into()),
        }
    }
}
