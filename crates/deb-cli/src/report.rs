//! JSON result file for automation

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::commands::Outcome;
use crate::error::{CliError, Result};

/// Content of the result file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptResult {
    pub description: String,
    pub versions: BTreeMap<String, String>,
    pub result_code: Option<String>,
    pub context: serde_json::Value,
}

fn versions() -> BTreeMap<String, String> {
    BTreeMap::from([("debmutate".to_string(), env!("CARGO_PKG_VERSION").to_string())])
}

impl ScriptResult {
    pub fn success(outcome: &Outcome) -> Self {
        Self {
            description: outcome.description.clone(),
            versions: versions(),
            result_code: None,
            context: outcome.context.clone(),
        }
    }

    pub fn failure(error: &CliError) -> Self {
        let context = match error.diff() {
            Some(diff) => serde_json::json!({ "diff": diff }),
            None => serde_json::Value::Null,
        };
        Self {
            description: error.to_string(),
            versions: versions(),
            result_code: Some(error.result_code().to_string()),
            context,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        deb_fs::write_atomic(path, content.as_bytes())?;
        tracing::debug!(path = %path.display(), "wrote result file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn success_has_null_code() {
        let outcome = Outcome {
            description: "Set Rules-Requires-Root.".into(),
            context: serde_json::json!({ "changed_files": ["debian/control"] }),
        };
        let result = ScriptResult::success(&outcome);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["result_code"], serde_json::Value::Null);
        assert_eq!(json["versions"]["debmutate"], env!("CARGO_PKG_VERSION"));
        assert_eq!(json["context"]["changed_files"][0], "debian/control");
    }

    #[test]
    fn failure_carries_code() {
        let result = ScriptResult::failure(&CliError::nothing_to_do("Already set."));
        assert_eq!(result.result_code.as_deref(), Some("nothing-to-do"));
        assert_eq!(result.description, "Already set.");
    }

    #[test]
    fn write_result_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        ScriptResult::failure(&CliError::user("bad")).write(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["description"], "bad");
        assert_eq!(json["result_code"], "usage-error");
    }
}
