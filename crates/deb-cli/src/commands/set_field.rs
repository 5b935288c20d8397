//! set-field command implementation

use deb_edit::{ControlFile, Error, edit_control};
use serde_json::json;

use super::{Outcome, relative_files};
use crate::config::ScriptConfig;
use crate::error::{CliError, Result};

/// Run the set-field command
pub fn run_set_field(
    config: &ScriptConfig,
    field: &str,
    value: &str,
    package: Option<&str>,
) -> Result<Outcome> {
    let mut previous = None;
    let outcome = edit_control(config.control_path(), config.editor.clone(), |doc| {
        let paragraph = match package {
            Some(name) => doc.binary_mut(name).ok_or_else(|| Error::ParagraphNotFound {
                key: format!("Package: {name}"),
            })?,
            None => doc.source_mut().ok_or_else(|| Error::MissingSourceParagraph {
                path: config.control_path(),
            })?,
        };
        previous = paragraph.get(field).map(str::to_string);
        paragraph.set(field, value)
    })?;

    if !outcome.changed() {
        return Err(CliError::nothing_to_do(format!("{field} is already set to {value:?}.")));
    }

    let target = package.unwrap_or("source");
    Ok(Outcome {
        description: format!("Set {field} in {target} paragraph."),
        context: json!({
            "field": field,
            "previous": previous,
            "value": value,
            "changed_files": relative_files(config, outcome.changed_files()),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deb_edit::EditorOptions;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const CONTROL: &str = "\
Source: foo
Section: utils

Package: foo
Architecture: any
Description: foo tool
";

    fn package() -> (TempDir, ScriptConfig) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("debian")).unwrap();
        fs::write(dir.path().join("debian/control"), CONTROL).unwrap();
        let config = ScriptConfig {
            directory: dir.path().to_path_buf(),
            result_path: None,
            editor: EditorOptions::new(),
        };
        (dir, config)
    }

    #[test]
    fn test_source_field() {
        let (dir, config) = package();
        let outcome = run_set_field(&config, "Section", "devel", None).unwrap();
        assert_eq!(outcome.context["previous"], "utils");
        assert_eq!(
            fs::read_to_string(dir.path().join("debian/control")).unwrap(),
            CONTROL.replace("Section: utils", "Section: devel")
        );
    }

    #[test]
    fn test_binary_field() {
        let (dir, config) = package();
        run_set_field(&config, "Architecture", "all", Some("foo")).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("debian/control")).unwrap(),
            CONTROL.replace("Architecture: any", "Architecture: all")
        );
    }

    #[test]
    fn test_unknown_package() {
        let (_dir, config) = package();
        let err = run_set_field(&config, "Section", "devel", Some("bar")).unwrap_err();
        assert!(matches!(err, CliError::Edit(Error::ParagraphNotFound { .. })));
    }

    #[test]
    fn test_same_value() {
        let (_dir, config) = package();
        let err = run_set_field(&config, "Section", "utils", None).unwrap_err();
        assert_eq!(err.result_code(), "nothing-to-do");
    }
}
