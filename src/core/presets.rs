//! Named extension groups used for bulk selection.

use serde::{Deserialize, Serialize};

/// A named group of file-name extensions that can be selected in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Entries starting with `.` match a file-name suffix. Entries without a dot
    /// (`dockerfile`, `makefile`) match the whole file name.
    pub extensions: Vec<String>,
}

impl FilterPreset {
    fn new(id: &str, name: &str, description: &str, extensions: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// The presets shipped by default.
pub fn builtin_presets() -> Vec<FilterPreset> {
    vec![
        FilterPreset::new(
            "frontend",
            "Frontend code",
            "HTML, CSS, JS, TS, React, Vue, Svelte",
            &[
                ".html", ".css", ".js", ".jsx", ".ts", ".tsx", ".vue", ".svelte", ".scss", ".sass",
                ".less",
            ],
        ),
        FilterPreset::new(
            "backend",
            "Backend code",
            "Go, Python, Java, C#, Rust, C/C++",
            &[
                ".go", ".py", ".java", ".cs", ".php", ".rb", ".rs", ".cpp", ".c", ".h",
            ],
        ),
        FilterPreset::new(
            "config",
            "Configuration",
            "JSON, YAML, XML, TOML, INI, ENV",
            &[
                ".json", ".yaml", ".yml", ".xml", ".toml", ".ini", ".env", ".config",
            ],
        ),
        FilterPreset::new(
            "docs",
            "Documentation",
            "README and other docs",
            &[".md", ".txt", ".rst", ".adoc"],
        ),
        FilterPreset::new(
            "build",
            "Build tooling",
            "Dockerfile, Makefile",
            &[".dockerfile", "dockerfile", "makefile", ".mk"],
        ),
    ]
}

/// Checks a file name against a list of extension patterns, ignoring case.
pub fn matches_extensions(file_name: &str, extensions: &[String]) -> bool {
    let name = file_name.to_lowercase();
    extensions.iter().any(|pattern| {
        let pattern = pattern.trim().to_lowercase();
        if pattern.is_empty() {
            false
        } else if pattern.starts_with('.') {
            name.ends_with(&pattern)
        } else {
            name == pattern
        }
    })
}
