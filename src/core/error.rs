//! Defines the custom error type for the `core` module.

use thiserror::Error;

/// The primary error type for the `core` module.
///
/// The selection engine itself never fails. These variants cover the
/// validation performed before a context document is assembled, so the
/// session layer can surface them as a status message instead of a crash.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// No project directory has been chosen for the current session.
    #[error("Please select a project directory first.")]
    NoRootDirectory,

    /// The selection set is empty, so there is nothing to serialize.
    #[error("Please select some files or folders first.")]
    EmptySelection,
}
