//! Semantic and textual diffs between document versions
//!
//! Semantic diffs walk two normalized documents and report the paths whose
//! meaning differs (`paragraphs[0].Depends`). Unified diffs are the
//! human-readable report attached to formatting errors.

use serde_json::Value;
use similar::TextDiff;

/// Normalized documents nest a few levels at most
const MAX_DEPTH: usize = 32;

/// Where two normalized documents disagree
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticChange {
    Added { path: String, value: Value },
    Removed { path: String, value: Value },
    Modified { path: String, old: Value, new: Value },
}

impl SemanticChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. } | Self::Removed { path, .. } | Self::Modified { path, .. } => path,
        }
    }
}

/// Changes between two normalized documents, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticDiff {
    pub changes: Vec<SemanticChange>,
}

impl SemanticDiff {
    pub fn compute(old: &Value, new: &Value) -> Self {
        let mut changes = Vec::new();
        walk(old, new, String::new(), 0, &mut changes);
        Self { changes }
    }

    pub fn is_equivalent(&self) -> bool {
        self.changes.is_empty()
    }

    /// Path of the first difference, used to locate formatting errors
    pub fn first_path(&self) -> Option<&str> {
        self.changes.first().map(SemanticChange::path)
    }
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn walk(old: &Value, new: &Value, path: String, depth: usize, changes: &mut Vec<SemanticChange>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) if depth < MAX_DEPTH => {
            for (key, old_value) in old_map {
                let path = child(&path, key);
                match new_map.get(key) {
                    Some(new_value) => walk(old_value, new_value, path, depth + 1, changes),
                    None => changes.push(SemanticChange::Removed {
                        path,
                        value: old_value.clone(),
                    }),
                }
            }
            changes.extend(
                new_map
                    .iter()
                    .filter(|(key, _)| !old_map.contains_key(*key))
                    .map(|(key, value)| SemanticChange::Added {
                        path: child(&path, key),
                        value: value.clone(),
                    }),
            );
        }
        (Value::Array(old_items), Value::Array(new_items)) if depth < MAX_DEPTH => {
            for index in 0..old_items.len().max(new_items.len()) {
                let path = format!("{path}[{index}]");
                match (old_items.get(index), new_items.get(index)) {
                    (Some(o), Some(n)) => walk(o, n, path, depth + 1, changes),
                    (Some(o), None) => changes.push(SemanticChange::Removed {
                        path,
                        value: o.clone(),
                    }),
                    (None, Some(n)) => changes.push(SemanticChange::Added {
                        path,
                        value: n.clone(),
                    }),
                    (None, None) => {}
                }
            }
        }
        _ if old != new => changes.push(SemanticChange::Modified {
            path,
            old: old.clone(),
            new: new.clone(),
        }),
        _ => {}
    }
}

/// Render a unified diff between two texts.
///
/// Headers are `--- original` and `+++ rewritten`; identical inputs produce an
/// empty string.
pub fn unified_diff(original: &str, rewritten: &str) -> String {
    if original == rewritten {
        return String::new();
    }
    TextDiff::from_lines(original, rewritten)
        .unified_diff()
        .context_radius(3)
        .header("original", "rewritten")
        .to_string()
}
