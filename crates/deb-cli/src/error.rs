//! Error types for deb-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from deb-edit
    #[error(transparent)]
    Edit(#[from] deb_edit::Error),

    /// Error from deb-fs
    #[error(transparent)]
    Fs(#[from] deb_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The package already is in the requested state
    #[error("{message}")]
    NothingToDo { message: String },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    pub fn nothing_to_do(message: impl Into<String>) -> Self {
        Self::NothingToDo {
            message: message.into(),
        }
    }

    /// Code reported in the result file
    pub fn result_code(&self) -> &'static str {
        use deb_edit::Error as E;
        match self {
            Self::NothingToDo { .. } => "nothing-to-do",
            Self::Edit(e) => match e {
                E::FormattingUnpreservable { .. } => "formatting-unpreservable",
                E::GeneratedFile { .. } => "generated-file",
                E::ChangeConflict { .. } => "change-conflict",
                E::MissingSourceParagraph { .. } => "missing-source-paragraph",
                E::Parse { .. } | E::Toml(_) | E::InvalidRelation { .. } | E::InvalidVersion { .. } => {
                    "parse-error"
                }
                _ => "io-error",
            },
            Self::User { .. } => "usage-error",
            Self::Fs(_) | Self::Io(_) | Self::Json(_) => "io-error",
        }
    }

    /// Unified diff for formatting failures
    pub fn diff(&self) -> Option<&str> {
        match self {
            Self::Edit(e) => e.diff(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cli_error_user() {
        let error = CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[test]
    fn test_result_codes() {
        assert_eq!(CliError::nothing_to_do("done").result_code(), "nothing-to-do");
        let generated = deb_edit::Error::generated("debian/control", None, "marked");
        assert_eq!(CliError::from(generated).result_code(), "generated-file");
        let missing = deb_edit::Error::MissingSourceParagraph {
            path: PathBuf::from("debian/control"),
        };
        assert_eq!(CliError::from(missing).result_code(), "missing-source-paragraph");
        let parse = deb_edit::Error::parse(3, "bad line");
        assert_eq!(CliError::from(parse).result_code(), "parse-error");
        assert_eq!(CliError::user("bad flags").result_code(), "usage-error");
    }
}
