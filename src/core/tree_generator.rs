//! Generates an ASCII representation of a directory tree.

use camino::Utf8Path;

use super::TreeEntry;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE_PREFIX: &str = "│   ";
const SPACE_PREFIX: &str = "    ";

/// A utility struct for generating an ASCII directory tree.
///
/// This struct is stateless and provides methods as associated functions.
pub struct TreeGenerator;

impl TreeGenerator {
    /// Renders the tree depth-first, one line per entry.
    ///
    /// Children are emitted in the order they appear in the tree. Directories
    /// carry a trailing `/`.
    pub fn render_tree_map(tree: &[TreeEntry]) -> String {
        let mut result = String::new();
        Self::render_level(tree, &mut result, "");
        result
    }

    /// Renders the map under a first line naming the root directory.
    pub fn render_with_root(root_dir: &str, tree: &[TreeEntry]) -> String {
        let mut result = format!("{}/\n", Self::root_name(root_dir));
        Self::render_level(tree, &mut result, "");
        result
    }

    /// The last path segment of the root directory, or the whole string when it has none.
    pub fn root_name(root_dir: &str) -> &str {
        let trimmed = root_dir.trim_end_matches(['/', '\\']);
        Utf8Path::new(trimmed)
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(root_dir)
    }

    fn render_level(entries: &[TreeEntry], result: &mut String, prefix: &str) {
        for (i, entry) in entries.iter().enumerate() {
            let is_last = i == entries.len() - 1;
            let connector = if is_last { LAST_BRANCH } else { BRANCH };
            let suffix = if entry.is_directory { "/" } else { "" };

            result.push_str(&format!("{prefix}{connector}{}{suffix}\n", entry.name));

            if !entry.children.is_empty() {
                let child_prefix = if is_last {
                    format!("{prefix}{SPACE_PREFIX}")
                } else {
                    format!("{prefix}{PIPE_PREFIX}")
                };
                Self::render_level(&entry.children, result, &child_prefix);
            }
        }
    }
}
