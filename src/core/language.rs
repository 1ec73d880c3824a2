//! Maps file names to the language tag placed after an opening code fence.

use camino::Utf8Path;

/// Determines the fence language hint for a file path.
///
/// Returns an empty string when no hint applies, which produces a bare fence.
pub fn detect_language(path: &str) -> &'static str {
    let path = Utf8Path::new(path);
    let file_name = path.file_name().unwrap_or_default();
    let lower_name = file_name.to_lowercase();

    if lower_name.ends_with(".d.ts") {
        return "typescript";
    }

    let extension = match path.extension() {
        Some(ext) => ext.to_lowercase(),
        None => {
            return match lower_name.as_str() {
                "dockerfile" => "dockerfile",
                "makefile" => "makefile",
                "gemfile" | "rakefile" => "ruby",
                "procfile" => "shell",
                _ => "",
            };
        }
    };

    match extension.as_str() {
        "go" => "go",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "jsx" => "jsx",
        "vue" => "vue",
        "svelte" => "svelte",
        "py" | "pyw" => "python",
        "java" => "java",
        "c" => "c",
        "cpp" | "cxx" | "cc" | "hpp" | "hxx" | "h" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "rs" => "rust",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" | "sass" => "scss",
        "less" => "less",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "md" | "markdown" => "markdown",
        "sh" | "bash" | "zsh" => "bash",
        "ps1" => "powershell",
        "sql" => "sql",
        "xml" => "xml",
        "toml" => "toml",
        "lua" => "lua",
        "pl" | "pm" => "perl",
        "r" => "r",
        "dart" => "dart",
        "ex" | "exs" => "elixir",
        "erl" | "hrl" => "erlang",
        "hs" => "haskell",
        "scala" => "scala",
        "clj" | "cljs" | "cljc" | "edn" => "clojure",
        "dockerfile" => "dockerfile",
        "mod" if file_name == "go.mod" => "go.mod",
        "sum" if file_name == "go.sum" => "go.sum",
        "tf" | "tfvars" => "terraform",
        "hcl" => "hcl",
        "gradle" => "groovy",
        "env" => "env",
        "conf" | "cfg" | "ini" => "ini",
        "log" => "log",
        "lock" => match file_name {
            "Gemfile.lock" => "ruby",
            "composer.lock" => "json",
            _ => "",
        },
        _ => "",
    }
}
