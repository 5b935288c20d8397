//! drop-mia-uploaders command implementation

use std::path::PathBuf;
use std::sync::LazyLock;

use deb_edit::lists::remove_from_field;
use deb_edit::{ChangelogHandler, ControlFile, Editor, Error, edit_control};
use regex::Regex;
use serde_json::json;

use super::{Outcome, relative_files};
use crate::config::ScriptConfig;
use crate::error::{CliError, Result};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^<>]+)>").unwrap());

/// Identity used when a new changelog block has to be opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Email address of an `Name <email>` list item, or the item itself.
fn email_of(uploader: &str) -> &str {
    EMAIL
        .captures(uploader)
        .and_then(|c| c.get(1))
        .map_or(uploader.trim(), |m| m.as_str().trim())
}

/// Run the drop-mia-uploaders command
pub fn run_drop_mia_uploaders(
    config: &ScriptConfig,
    mia: &[String],
    update_changelog: bool,
    identity: &Identity,
) -> Result<Outcome> {
    let changelog = match update_changelog {
        true => Some(PendingChangelog::open(config, identity)?),
        false => None,
    };

    let mut removed = Vec::new();
    let outcome = edit_control(config.control_path(), config.editor.clone(), |doc| {
        let source = doc.source_mut().ok_or_else(|| Error::MissingSourceParagraph {
            path: config.control_path(),
        })?;
        removed = remove_from_field(source, "Uploaders", |item| {
            let email = email_of(item);
            mia.iter().any(|m| m.eq_ignore_ascii_case(email))
        })?;
        Ok(())
    })?;

    if removed.is_empty() {
        return Err(CliError::nothing_to_do("No MIA uploaders to remove."));
    }
    tracing::debug!(?removed, "removed uploaders");

    let description = format!("Remove MIA uploader{}.", if removed.len() == 1 { "" } else { "s" });
    let mut changed = outcome.changed_files().to_vec();
    if let Some(changelog) = changelog {
        changed.extend(changelog.record(&[&description, &removed.join(", ")])?);
    }

    Ok(Outcome {
        description,
        context: json!({
            "removed": removed,
            "changed_files": relative_files(config, &changed),
        }),
    })
}

/// A changelog opened before the control edit, so that a missing identity
/// is reported before anything is written.
struct PendingChangelog<'a> {
    editor: Editor<ChangelogHandler>,
    /// Signature for a new block; `None` appends to the unreleased top block
    maintainer: Option<(&'a str, &'a str)>,
}

impl<'a> PendingChangelog<'a> {
    fn open(config: &ScriptConfig, identity: &'a Identity) -> Result<Self> {
        let editor = Editor::open(config.debian_path("changelog"), ChangelogHandler::new(), config.editor.clone())?;
        let unreleased = editor.document().top().is_some_and(|top| top.is_unreleased());
        let maintainer = match (unreleased, identity.name.as_deref(), identity.email.as_deref()) {
            (true, _, _) => None,
            (false, Some(name), Some(email)) => Some((name, email)),
            (false, _, _) => {
                return Err(CliError::user(
                    "a new changelog entry needs --maintainer-name and --maintainer-email",
                ));
            }
        };
        Ok(Self { editor, maintainer })
    }

    fn record(mut self, lines: &[&str]) -> Result<Vec<PathBuf>> {
        match self.maintainer {
            Some(maintainer) => {
                let now = chrono::Local::now().fixed_offset();
                self.editor.document_mut().add_entry(lines, maintainer, now)?;
            }
            None => {
                if let Some(top) = self.editor.document_mut().top_mut() {
                    top.add_change(lines);
                }
            }
        }
        Ok(self.editor.commit()?.changed_files().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deb_edit::EditorOptions;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    const CONTROL: &str = "\
Source: foo
Maintainer: Jane <jane@example.com>
Uploaders: Alice <alice@example.com>, Bob <bob@example.com>

Package: foo
Description: foo
";

    const RELEASED: &str = "\
foo (1.0-1) unstable; urgency=medium

  * Initial release.

 -- Jane <jane@example.com>  Mon, 02 Jan 2023 10:00:00 +0000
";

    fn package(changelog: Option<&str>) -> (TempDir, ScriptConfig) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("debian")).unwrap();
        fs::write(dir.path().join("debian/control"), CONTROL).unwrap();
        if let Some(changelog) = changelog {
            fs::write(dir.path().join("debian/changelog"), changelog).unwrap();
        }
        let config = ScriptConfig {
            directory: dir.path().to_path_buf(),
            result_path: None,
            editor: EditorOptions::new(),
        };
        (dir, config)
    }

    #[rstest]
    #[case("Alice <alice@example.com>", "alice@example.com")]
    #[case("bob@example.com", "bob@example.com")]
    #[case(" Carol < carol@example.com >", "carol@example.com")]
    fn test_email_of(#[case] item: &str, #[case] expected: &str) {
        assert_eq!(email_of(item), expected);
    }

    #[test]
    fn test_removes_uploader() {
        let (dir, config) = package(None);
        let outcome =
            run_drop_mia_uploaders(&config, &["BOB@example.com".into()], false, &Identity::default()).unwrap();
        assert_eq!(outcome.description, "Remove MIA uploader.");
        assert_eq!(outcome.context["removed"][0], "Bob <bob@example.com>");
        let control = fs::read_to_string(dir.path().join("debian/control")).unwrap();
        assert!(control.contains("Uploaders: Alice <alice@example.com>\n"));
    }

    #[test]
    fn test_removes_field_when_empty() {
        let (dir, config) = package(None);
        let mia = vec!["alice@example.com".to_string(), "bob@example.com".to_string()];
        run_drop_mia_uploaders(&config, &mia, false, &Identity::default()).unwrap();
        let control = fs::read_to_string(dir.path().join("debian/control")).unwrap();
        assert!(!control.contains("Uploaders"));
    }

    #[test]
    fn test_nothing_to_remove() {
        let (dir, config) = package(None);
        let err = run_drop_mia_uploaders(&config, &["carol@example.com".into()], false, &Identity::default())
            .unwrap_err();
        assert_eq!(err.result_code(), "nothing-to-do");
        assert_eq!(fs::read_to_string(dir.path().join("debian/control")).unwrap(), CONTROL);
    }

    #[test]
    fn test_changelog_opens_new_block() {
        let (dir, config) = package(Some(RELEASED));
        let identity = Identity {
            name: Some("Jane".into()),
            email: Some("jane@example.com".into()),
        };
        let outcome = run_drop_mia_uploaders(&config, &["bob@example.com".into()], true, &identity).unwrap();
        assert_eq!(outcome.context["changed_files"][1], "debian/changelog");
        let changelog = fs::read_to_string(dir.path().join("debian/changelog")).unwrap();
        assert!(changelog.starts_with("foo (1.0-2) UNRELEASED; urgency=medium\n"));
        assert!(changelog.contains("  * Remove MIA uploader.\n"));
        assert!(changelog.contains("Bob <bob@example.com>"));
        assert!(changelog.ends_with(RELEASED));
    }

    #[test]
    fn test_changelog_needs_identity() {
        let (dir, config) = package(Some(RELEASED));
        let err = run_drop_mia_uploaders(&config, &["bob@example.com".into()], true, &Identity::default())
            .unwrap_err();
        assert!(err.to_string().contains("--maintainer-name"));
        assert_eq!(err.result_code(), "usage-error");
        assert_eq!(fs::read_to_string(dir.path().join("debian/control")).unwrap(), CONTROL);
        assert_eq!(fs::read_to_string(dir.path().join("debian/changelog")).unwrap(), RELEASED);
    }

    #[test]
    fn test_missing_changelog_leaves_control() {
        let (dir, config) = package(None);
        let identity = Identity {
            name: Some("Jane".into()),
            email: Some("jane@example.com".into()),
        };
        assert!(run_drop_mia_uploaders(&config, &["bob@example.com".into()], true, &identity).is_err());
        assert_eq!(fs::read_to_string(dir.path().join("debian/control")).unwrap(), CONTROL);
    }

    #[test]
    fn test_changelog_unreleased_block() {
        let unreleased = RELEASED.replace("unstable", "UNRELEASED");
        let (dir, config) = package(Some(&unreleased));
        run_drop_mia_uploaders(&config, &["alice@example.com".into()], true, &Identity::default()).unwrap();
        let changelog = fs::read_to_string(dir.path().join("debian/changelog")).unwrap();
        assert!(changelog.starts_with("foo (1.0-1) UNRELEASED; urgency=medium\n"));
        assert!(changelog.contains("  * Initial release.\n  * Remove MIA uploader.\n"));
    }
}
