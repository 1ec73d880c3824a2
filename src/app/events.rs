//! Defines the event and message structures for communication between the backend and frontend.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::view_model::UiState;

/// Events sent from the session controller to the UI.
#[derive(Debug)]
pub enum UserEvent {
    /// A complete state update to re-render the UI.
    StateUpdate(Box<UiState>),
    /// A freshly generated context document.
    ShowGeneratedContent(Box<GeneratedContext>),
    /// A message for the status area.
    ShowStatus(StatusMessage),
    /// The result of a clipboard copy.
    CopyComplete(bool),
    /// The result of a configuration export.
    ConfigExported(bool),
}

/// A message received from the UI via the IPC channel.
#[derive(Deserialize, Debug)]
pub struct IpcMessage {
    /// The name of the command to execute.
    pub command: String,
    /// The payload associated with the command, as a JSON value.
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl StatusMessage {
    pub fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(StatusLevel::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, text)
    }
}

/// The generated document together with its split blocks and size metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContext {
    pub document: String,
    pub file_map: String,
    pub file_contents: String,
    pub file_count: usize,
    pub byte_count: usize,
    pub line_count: usize,
    pub token_count: Option<usize>,
}
