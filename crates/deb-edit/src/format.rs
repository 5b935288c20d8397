//! Format detection and handler trait

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Supported packaging file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    Control,
    Copyright,
    Deb822,
    Changelog,
    Watch,
    Series,
    LintianOverrides,
    Maintscript,
    Debcargo,
    Rules,
}

impl Format {
    /// Detect format from a path inside a `debian/` directory
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = name.strip_suffix(".in").unwrap_or(&name);

        match name {
            "control" if parent != "tests" => Self::Control,
            "copyright" => Self::Copyright,
            "changelog" => Self::Changelog,
            "watch" => Self::Watch,
            "series" if parent == "patches" => Self::Series,
            "lintian-overrides" => Self::LintianOverrides,
            "maintscript" => Self::Maintscript,
            "debcargo.toml" => Self::Debcargo,
            "rules" => Self::Rules,
            n if n.ends_with(".lintian-overrides") => Self::LintianOverrides,
            n if n.ends_with(".maintscript") => Self::Maintscript,
            _ => Self::Deb822,
        }
    }

    /// Short, stable name used in logs and result files
    pub fn name(&self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Copyright => "copyright",
            Self::Deb822 => "deb822",
            Self::Changelog => "changelog",
            Self::Watch => "watch",
            Self::Series => "series",
            Self::LintianOverrides => "lintian-overrides",
            Self::Maintscript => "maintscript",
            Self::Debcargo => "debcargo",
            Self::Rules => "rules",
        }
    }

    /// Whether the format is built on deb822 paragraphs
    pub fn is_deb822(&self) -> bool {
        matches!(self, Self::Control | Self::Copyright | Self::Deb822)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for format-specific handlers.
///
/// A handler owns every format rule: how text becomes a document, how a
/// document becomes text again, and how a document is reduced to a JSON value
/// for semantic comparison. Transactions, provenance and writing are handled
/// by [`crate::Editor`].
pub trait FormatHandler {
    /// In-memory editable model
    type Document: Clone;

    /// Format identifier
    fn format(&self) -> Format;

    /// Parse source into the editable model
    fn parse(&self, source: &str) -> Result<Self::Document>;

    /// Parse a template (`*.in`) that may contain substitution tokens.
    ///
    /// Formats without template syntax parse templates like regular files.
    fn parse_template(&self, source: &str) -> Result<Self::Document> {
        self.parse(source)
    }

    /// Model used when the file does not exist yet
    fn empty(&self) -> Self::Document;

    /// Render the model back to text
    fn render(&self, doc: &Self::Document) -> String;

    /// Normalize a document for semantic comparison
    fn normalize(&self, doc: &Self::Document) -> serde_json::Value;

    /// Format-specific checks run on freshly parsed documents
    fn validate(&self, _doc: &Self::Document, _path: &Path) -> Result<()> {
        Ok(())
    }
}
