//! Error types for deb-edit

use std::path::{Path, PathBuf};

/// Result type for deb-edit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or editing packaging files
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to parse {}: line {line}: {message}", display_path(.path.as_deref()))]
    Parse {
        path: Option<PathBuf>,
        line: usize,
        message: String,
    },

    #[error("{} has no Source paragraph", .path.display())]
    MissingSourceParagraph { path: PathBuf },

    #[error("Unable to preserve formatting of {} at {location}", .path.display())]
    FormattingUnpreservable {
        path: PathBuf,
        location: String,
        diff: String,
    },

    #[error("{} is generated{}: {reason}", .path.display(), display_template(.template.as_deref()))]
    GeneratedFile {
        path: PathBuf,
        template: Option<PathBuf>,
        reason: String,
    },

    #[error("Conflicting change in {}: {reason}", .path.display())]
    ChangeConflict { path: PathBuf, reason: String },

    #[error("Field not found: {field}")]
    FieldNotFound { field: String },

    #[error("Paragraph not found: {key}")]
    ParagraphNotFound { key: String },

    #[error("Invalid field name: {name:?}")]
    InvalidFieldName { name: String },

    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid relation {text:?}: {message}")]
    InvalidRelation { text: String, message: String },

    #[error("Invalid version {version:?}: {message}")]
    InvalidVersion { version: String, message: String },

    #[error("Unknown variable {variable:?} in tag format {tag:?}")]
    TagFormat { tag: String, variable: String },

    #[error("Cannot update debhelper: {reason}")]
    Debhelper { reason: String },

    #[error("Cannot edit {}: {reason}", .path.display())]
    Unsupported { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fs(#[from] deb_fs::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml_edit::TomlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<input>".to_string())
}

fn display_template(template: Option<&Path>) -> String {
    template
        .map(|t| format!(" from {}", t.display()))
        .unwrap_or_default()
}

impl Error {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: None,
            line,
            message: message.into(),
        }
    }

    pub fn field_not_found(field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            field: field.into(),
        }
    }

    pub fn conflict(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ChangeConflict {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn generated(
        path: impl Into<PathBuf>,
        template: Option<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::GeneratedFile {
            path: path.into(),
            template,
            reason: reason.into(),
        }
    }

    /// Attach a file path to a parse error that was raised on in-memory text.
    pub fn with_path(self, file: &Path) -> Self {
        match self {
            Self::Parse {
                path: None,
                line,
                message,
            } => Self::Parse {
                path: Some(file.to_path_buf()),
                line,
                message,
            },
            other => other,
        }
    }

    /// Unified diff between the original and rewritten text, for errors that carry one.
    pub fn diff(&self) -> Option<&str> {
        match self {
            Self::FormattingUnpreservable { diff, .. } => Some(diff),
            _ => None,
        }
    }
}
