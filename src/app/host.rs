//! The collaborator interface through which the session reaches the host runtime.

use anyhow::Result;
use async_trait::async_trait;

use crate::core::{FileContentResult, TreeEntry};

/// Everything OS-facing: directory choice, enumeration, file reads and the clipboard.
///
/// Implemented by the host shell. Tests provide a mock.
#[async_trait]
pub trait HostServices: Send + Sync {
    /// Shows a directory picker. `None` means the user cancelled.
    async fn choose_directory(&self) -> Result<Option<String>>;

    /// Enumerates the directory as a tree whose paths are unique.
    async fn list_directory(&self, root: &str) -> Result<Vec<TreeEntry>>;

    /// Reads the given files in one batch. Results may come back in any order.
    async fn fetch_file_contents(
        &self,
        root: &str,
        paths: &[String],
    ) -> Result<Vec<FileContentResult>>;

    async fn copy_to_clipboard(&self, text: &str) -> Result<()>;
}
