pub mod context;
pub mod error;
pub mod language;
pub mod model;
pub mod presets;
pub mod ranking;
pub mod selection;
pub mod tree_generator;

pub use context::{
    AuxiliaryFile, AuxiliaryKind, ContextDocument, ContextOptions, ContextRequest,
    ContextSerializer,
};
pub use error::CoreError;
pub use model::{FileContentResult, TreeEntry};
pub use presets::FilterPreset;
pub use selection::{SelectionSet, SelectionState};
pub use tree_generator::TreeGenerator;
