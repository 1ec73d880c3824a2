pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::presets::builtin_presets;
pub use crate::core::{ContextOptions, FilterPreset};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Optional sections of the generated document.
    pub context: ContextOptions,
    /// Copy the document to the clipboard as soon as it is generated.
    pub copy_on_generate: bool,
    /// How many files the size ranking shows.
    pub size_ranking_limit: usize,
    pub count_tokens: bool,
    pub filter_presets: Vec<FilterPreset>,
}

impl AppConfig {
    /// Loads the configuration from the platform config directory.
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    pub fn preset(&self, id: &str) -> Option<&FilterPreset> {
        self.filter_presets.iter().find(|preset| preset.id == id)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            context: ContextOptions::default(),
            copy_on_generate: true,
            size_ranking_limit: 20,
            count_tokens: true,
            filter_presets: builtin_presets(),
        }
    }
}
