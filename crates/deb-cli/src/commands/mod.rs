//! Command implementations

mod drop_mia_uploaders;
mod enable_rrr;
mod set_field;

pub use drop_mia_uploaders::{Identity, run_drop_mia_uploaders};
pub use enable_rrr::run_enable_rrr;
pub use set_field::run_set_field;

use std::path::Path;

use crate::config::ScriptConfig;

/// What a successful command did
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub description: String,
    pub context: serde_json::Value,
}

/// Changed files as paths relative to the package directory
fn relative_files(config: &ScriptConfig, files: &[impl AsRef<Path>]) -> Vec<String> {
    files
        .iter()
        .map(|f| config.relative(f.as_ref()).display().to_string())
        .collect()
}
