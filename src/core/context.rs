//! Assembles the context document from a tree, a selection and fetched contents.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::language::detect_language;
use super::model::walk_tree;
use super::{CoreError, FileContentResult, SelectionSet, TreeEntry, TreeGenerator};

/// Inline error used when the host returned nothing for a selected file.
pub const MISSING_RESULT_ERROR: &str = "no content returned for this file";

const OVERVIEW_FILES: &[&str] = &["readme.md", "readme", "readme.txt", "readme.rst"];
const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "go.mod",
    "cargo.toml",
    "requirements.txt",
    "pyproject.toml",
    "pom.xml",
    "build.gradle",
    "composer.json",
    "gemfile",
];
const IGNORE_FILES: &[&str] = &[".gitignore"];

/// Which optional sections go into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextOptions {
    pub include_overview: bool,
    pub include_dependencies: bool,
    pub include_gitignore: bool,
    /// Wraps the whole document in a `<prompt>` block.
    pub unified_prompt: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            include_overview: true,
            include_dependencies: true,
            include_gitignore: false,
            unified_prompt: true,
        }
    }
}

/// The kind of a top-level project file that can be attached as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxiliaryKind {
    Overview,
    Dependencies,
    Gitignore,
}

impl AuxiliaryKind {
    fn tag(self) -> &'static str {
        match self {
            AuxiliaryKind::Overview => "project_overview",
            AuxiliaryKind::Dependencies => "dependencies",
            AuxiliaryKind::Gitignore => "gitignore",
        }
    }
}

/// An auxiliary file found at the tree's top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFile {
    pub kind: AuxiliaryKind,
    pub path: String,
}

/// The assembled output. `document` is what gets copied; the two blocks are
/// kept separately so either can be copied alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDocument {
    pub document: String,
    pub file_map: String,
    pub file_contents: String,
}

/// Everything `build_context_document` reads.
#[derive(Debug, Clone, Copy)]
pub struct ContextRequest<'a> {
    pub root_dir: Option<&'a str>,
    pub tree: &'a [TreeEntry],
    pub selection: &'a SelectionSet,
    pub summary: &'a str,
    pub options: &'a ContextOptions,
}

/// A stateless serializer, following the same associated-function style as
/// [`TreeGenerator`].
pub struct ContextSerializer;

impl ContextSerializer {
    /// Checks the preconditions for generation and returns the root directory.
    pub fn validate<'a>(
        root_dir: Option<&'a str>,
        selection: &SelectionSet,
    ) -> Result<&'a str, CoreError> {
        let root = root_dir
            .filter(|root| !root.trim().is_empty())
            .ok_or(CoreError::NoRootDirectory)?;
        if selection.is_empty() {
            return Err(CoreError::EmptySelection);
        }
        Ok(root)
    }

    /// Selected paths that resolve to files, in tree pre-order.
    ///
    /// Directory paths and paths no longer in the tree are skipped.
    pub fn collect_selected_files(tree: &[TreeEntry], selection: &SelectionSet) -> Vec<String> {
        let mut files = Vec::new();
        walk_tree(tree, |entry| {
            if !entry.is_directory && selection.is_selected(&entry.path) {
                files.push(entry.path.clone());
            }
        });
        files
    }

    /// The enabled auxiliary files present among the tree's top-level entries.
    ///
    /// At most one file per kind, taking the first match in tree order.
    pub fn auxiliary_files(tree: &[TreeEntry], options: &ContextOptions) -> Vec<AuxiliaryFile> {
        let wanted = [
            (AuxiliaryKind::Overview, options.include_overview, OVERVIEW_FILES),
            (
                AuxiliaryKind::Dependencies,
                options.include_dependencies,
                MANIFEST_FILES,
            ),
            (AuxiliaryKind::Gitignore, options.include_gitignore, IGNORE_FILES),
        ];

        wanted
            .into_iter()
            .filter(|(_, enabled, _)| *enabled)
            .filter_map(|(kind, _, names)| {
                tree.iter()
                    .filter(|entry| !entry.is_directory)
                    .find(|entry| names.contains(&entry.name.to_lowercase().as_str()))
                    .map(|entry| AuxiliaryFile {
                        kind,
                        path: entry.path.clone(),
                    })
            })
            .collect()
    }

    /// Every path whose contents the document needs, each listed once.
    pub fn paths_to_fetch(
        tree: &[TreeEntry],
        selection: &SelectionSet,
        options: &ContextOptions,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let selected = Self::collect_selected_files(tree, selection);
        let auxiliary = Self::auxiliary_files(tree, options)
            .into_iter()
            .map(|aux| aux.path);
        selected
            .into_iter()
            .chain(auxiliary)
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }

    /// Builds the document in its fixed section order.
    ///
    /// `fetched` may be in any order; results are matched to files by path.
    pub fn build_context_document(
        request: &ContextRequest<'_>,
        fetched: &[FileContentResult],
    ) -> Result<ContextDocument, CoreError> {
        let root = Self::validate(request.root_dir, request.selection)?;
        let results: HashMap<&str, &FileContentResult> = fetched
            .iter()
            .map(|result| (result.path.as_str(), result))
            .collect();

        let file_map = format!(
            "<file_map>\n{}</file_map>\n",
            TreeGenerator::render_with_root(root, request.tree)
        );

        let mut file_contents = String::from("<file_contents>\n");
        for path in Self::collect_selected_files(request.tree, request.selection) {
            Self::push_file_entry(&mut file_contents, &path, results.get(path.as_str()).copied());
        }
        file_contents.push_str("</file_contents>\n");

        let mut document = String::new();
        if request.options.unified_prompt {
            document.push_str("<prompt>\n");
        }

        let summary = request.summary.trim();
        if !summary.is_empty() {
            document.push_str(&format!("<summary>\n{summary}\n</summary>\n\n"));
        }

        for aux in Self::auxiliary_files(request.tree, request.options) {
            match results.get(aux.path.as_str()) {
                Some(result) if result.error.is_none() && !result.is_binary => {
                    let tag = aux.kind.tag();
                    document.push_str(&format!(
                        "<{tag} file=\"{}\">\n",
                        escape_attribute(&aux.path)
                    ));
                    push_with_newline(&mut document, &result.content);
                    document.push_str(&format!("</{tag}>\n\n"));
                }
                _ => tracing::debug!("Skipping unavailable auxiliary file {}", aux.path),
            }
        }

        document.push_str(&file_map);
        document.push('\n');
        document.push_str(&file_contents);

        if request.options.unified_prompt {
            document.push_str("</prompt>\n");
        }

        Ok(ContextDocument {
            document,
            file_map,
            file_contents,
        })
    }

    fn push_file_entry(out: &mut String, path: &str, result: Option<&FileContentResult>) {
        out.push_str(&format!("File: {path}\n"));
        match result {
            None => out.push_str(&format!("Error: {MISSING_RESULT_ERROR}\n")),
            Some(FileContentResult {
                error: Some(message),
                ..
            }) => out.push_str(&format!("Error: {message}\n")),
            Some(result) if result.is_binary => push_with_newline(out, &result.content),
            Some(result) => {
                let fence = fence_for(&result.content);
                out.push_str(&format!("{fence}{}\n", detect_language(path)));
                push_with_newline(out, &result.content);
                out.push_str(&format!("{fence}\n"));
            }
        }
        out.push('\n');
    }
}

/// Escapes a value for use inside a double-quoted tag attribute.
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Picks a backtick fence that cannot be closed by the content itself.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(if longest >= 3 { longest + 1 } else { 3 })
}

fn push_with_newline(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
}
