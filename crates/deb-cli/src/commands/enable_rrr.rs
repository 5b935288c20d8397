//! enable-rrr command implementation

use deb_edit::{ControlFile, Error, edit_control};
use serde_json::json;

use super::{Outcome, relative_files};
use crate::config::ScriptConfig;
use crate::error::{CliError, Result};

const FIELD: &str = "Rules-Requires-Root";

/// Run the enable-rrr command
pub fn run_enable_rrr(config: &ScriptConfig, force: bool) -> Result<Outcome> {
    let mut previous = None;
    let outcome = edit_control(config.control_path(), config.editor.clone(), |doc| {
        let source = doc.source_mut().ok_or_else(|| Error::MissingSourceParagraph {
            path: config.control_path(),
        })?;
        previous = source.get(FIELD).map(str::to_string);
        match previous.as_deref() {
            Some("no") => Ok(()),
            Some(_) if !force => Ok(()),
            _ => source.set(FIELD, "no"),
        }
    })?;

    if !outcome.changed() {
        let message = match previous.as_deref() {
            Some("no") | None => format!("{FIELD} is already set to no."),
            Some(value) => format!("{FIELD} is set to {value:?}; use --force to replace it."),
        };
        return Err(CliError::nothing_to_do(message));
    }

    Ok(Outcome {
        description: format!("Set {FIELD}: no."),
        context: json!({
            "previous": previous,
            "changed_files": relative_files(config, outcome.changed_files()),
        }),
    })
}
