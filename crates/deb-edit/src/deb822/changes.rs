//! Field-level change sets between two versions of a deb822 file
//!
//! Paragraphs are identified by their `Source` or `Package` field, so a
//! change set computed on a generated file can be replayed on the template
//! it came from.

use serde::Serialize;

use super::document::Document;
use super::order::FieldOrder;
use super::paragraph::Paragraph;
use crate::error::{Error, Result};
use std::path::Path;

/// Identifies a paragraph across files: `("Source", name)` or `("Package", name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParagraphKey {
    pub field: String,
    pub value: String,
}

impl ParagraphKey {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Key of a paragraph, from `Source` or else `Package`
    pub fn of(paragraph: &Paragraph) -> Option<Self> {
        ["Source", "Package"]
            .into_iter()
            .find_map(|field| paragraph.get(field).map(|value| Self::new(field, value)))
    }
}

impl std::fmt::Display for ParagraphKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.value)
    }
}

/// A field whose value differs; `None` means absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// A change that does not apply cleanly
#[derive(Debug)]
pub struct Conflict<'a> {
    pub paragraph: &'a ParagraphKey,
    pub field: &'a str,
    /// Value the change was computed against
    pub baseline: Option<&'a str>,
    /// Value found in the document being patched
    pub current: Option<&'a str>,
    pub new: Option<&'a str>,
}

impl Conflict<'_> {
    pub fn to_error(&self, path: &Path) -> Error {
        Error::conflict(
            path,
            format!(
                "{} field {}: expected {:?}, found {:?}",
                self.paragraph, self.field, self.baseline, self.current
            ),
        )
    }
}

/// Changes between two documents, grouped by paragraph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    paragraphs: Vec<(ParagraphKey, Vec<FieldChange>)>,
}

impl ChangeSet {
    /// Compute the changes that turn `baseline` into `edited`.
    ///
    /// Paragraphs without a `Source` or `Package` field are not tracked.
    pub fn between(baseline: &Document, edited: &Document) -> Self {
        let keyed = |doc: &Document| -> Vec<(ParagraphKey, Paragraph)> {
            doc.paragraphs()
                .iter()
                .filter_map(|p| ParagraphKey::of(p).map(|k| (k, p.clone())))
                .collect()
        };
        let old = keyed(baseline);
        let new = keyed(edited);

        let mut keys: Vec<&ParagraphKey> = old.iter().map(|(k, _)| k).collect();
        for (key, _) in &new {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let empty = Paragraph::new();
        let lookup = |list: &'_ [(ParagraphKey, Paragraph)], key: &ParagraphKey| {
            list.iter()
                .find(|(k, _)| k == key)
                .map(|(_, p)| p.clone())
        };

        let mut paragraphs = Vec::new();
        for key in keys {
            let old_p = lookup(&old, key).unwrap_or_else(|| empty.clone());
            let new_p = lookup(&new, key).unwrap_or_else(|| empty.clone());
            let mut names: Vec<&str> = old_p.names().collect();
            for name in new_p.names() {
                if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                    names.push(name);
                }
            }
            let changes: Vec<FieldChange> = names
                .into_iter()
                .filter_map(|name| {
                    let (a, b) = (old_p.get(name), new_p.get(name));
                    (a != b).then(|| FieldChange {
                        field: name.to_string(),
                        old: a.map(str::to_string),
                        new: b.map(str::to_string),
                    })
                })
                .collect();
            if !changes.is_empty() {
                paragraphs.push((key.clone(), changes));
            }
        }
        Self { paragraphs }
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParagraphKey, &[FieldChange])> {
        self.paragraphs.iter().map(|(k, c)| (k, c.as_slice()))
    }

    pub fn get(&self, key: &ParagraphKey) -> Option<&[FieldChange]> {
        self.paragraphs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| c.as_slice())
    }

    /// Replay the changes on `doc`.
    ///
    /// When a field's current value is not the value the change was computed
    /// against, `resolve` decides the value to write (`None` removes the
    /// field) or fails. Changes for paragraphs `doc` does not have create
    /// new paragraphs at the end.
    pub fn apply(
        &self,
        doc: &mut Document,
        mut resolve: impl FnMut(&Conflict<'_>) -> Result<Option<String>>,
    ) -> Result<()> {
        let mut pending: Vec<&(ParagraphKey, Vec<FieldChange>)> = self.paragraphs.iter().collect();
        let mut emptied = false;

        for paragraph in doc.paragraphs_mut() {
            let Some(key) = ParagraphKey::of(paragraph) else {
                continue;
            };
            let Some(index) = pending.iter().position(|(k, _)| *k == key) else {
                continue;
            };
            let (key, changes) = pending.remove(index);
            for change in changes {
                let current = paragraph.get(&change.field).map(str::to_string);
                let value = if current.as_deref() == change.old.as_deref() {
                    change.new.clone()
                } else {
                    resolve(&Conflict {
                        paragraph: key,
                        field: &change.field,
                        baseline: change.old.as_deref(),
                        current: current.as_deref(),
                        new: change.new.as_deref(),
                    })?
                };
                match value {
                    Some(value) => paragraph.set(&change.field, value)?,
                    None => {
                        paragraph.take(&change.field);
                    }
                }
            }
            emptied |= paragraph.is_empty();
        }

        for (key, changes) in pending {
            let order = if key.field == "Source" {
                FieldOrder::Source
            } else {
                FieldOrder::Binary
            };
            let mut paragraph = Paragraph::new().with_order(order);
            for change in changes {
                let value = match change.old {
                    None => change.new.clone(),
                    Some(_) => resolve(&Conflict {
                        paragraph: key,
                        field: &change.field,
                        baseline: change.old.as_deref(),
                        current: None,
                        new: change.new.as_deref(),
                    })?,
                };
                if let Some(value) = value {
                    paragraph.set(&change.field, value)?;
                }
            }
            if !paragraph.is_empty() {
                tracing::debug!(paragraph = %key, "adding paragraph from change set");
                doc.push(paragraph);
            }
        }

        if emptied {
            doc.retain(|p| !p.is_empty());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONTROL: &str = "\
Source: blah
Build-Depends: debhelper-compat (= 13)

Package: blah
Description: B
";

    fn doc(text: &str) -> Document {
        Document::parse(text).unwrap()
    }

    fn fail(conflict: &Conflict<'_>) -> Result<Option<String>> {
        Err(conflict.to_error(Path::new("debian/control.in")))
    }

    #[test]
    fn test_changes_between() {
        let base = doc(CONTROL);
        let mut edited = base.clone();
        edited.paragraph_mut(0).unwrap().set("Rules-Requires-Root", "no").unwrap();
        edited.paragraph_mut(1).unwrap().remove("Description").unwrap();

        let changes = ChangeSet::between(&base, &edited);
        let source = changes.get(&ParagraphKey::new("Source", "blah")).unwrap();
        assert_eq!(
            source,
            &[FieldChange {
                field: "Rules-Requires-Root".into(),
                old: None,
                new: Some("no".into()),
            }]
        );
        let binary = changes.get(&ParagraphKey::new("Package", "blah")).unwrap();
        assert_eq!(binary[0].new, None);
    }

    #[test]
    fn test_no_changes() {
        let base = doc(CONTROL);
        assert!(ChangeSet::between(&base, &base.clone()).is_empty());
    }

    #[test]
    fn test_apply_to_template() {
        let base = doc(CONTROL);
        let mut edited = base.clone();
        edited.paragraph_mut(0).unwrap().set("Rules-Requires-Root", "no").unwrap();
        let changes = ChangeSet::between(&base, &edited);

        let mut template = Document::parse_template(
            "Source: blah\nBuild-Depends: @cdbs@\n\nPackage: blah\nDescription: B\n@EXTRA@\n",
        )
        .unwrap();
        changes.apply(&mut template, fail).unwrap();
        assert_eq!(
            template.render(),
            "Source: blah\nBuild-Depends: @cdbs@\nRules-Requires-Root: no\n\nPackage: blah\nDescription: B\n@EXTRA@\n"
        );
    }

    #[test]
    fn test_conflict_is_reported() {
        let base = doc(CONTROL);
        let mut edited = base.clone();
        edited
            .paragraph_mut(0)
            .unwrap()
            .set("Build-Depends", "debhelper-compat (= 13), cdbs")
            .unwrap();
        let changes = ChangeSet::between(&base, &edited);

        let mut template = doc("Source: blah\nBuild-Depends: @cdbs@\n");
        let err = changes.apply(&mut template, fail).unwrap_err();
        assert!(matches!(err, Error::ChangeConflict { .. }));
    }

    #[test]
    fn test_resolver_decides_value() {
        let base = doc(CONTROL);
        let mut edited = base.clone();
        edited.paragraph_mut(0).unwrap().set("Build-Depends", "new").unwrap();
        let changes = ChangeSet::between(&base, &edited);

        let mut template = doc("Source: blah\nBuild-Depends: other\n");
        changes
            .apply(&mut template, |c| Ok(Some(format!("{} + {}", c.current.unwrap_or(""), c.new.unwrap_or("")))))
            .unwrap();
        assert_eq!(template.render(), "Source: blah\nBuild-Depends: other + new\n");
    }

    #[test]
    fn test_new_paragraph_is_appended() {
        let base = doc(CONTROL);
        let mut edited = base.clone();
        edited.push(Paragraph::from_fields([("Package", "blah-doc"), ("Architecture", "all")]));
        let changes = ChangeSet::between(&base, &edited);

        let mut template = doc(CONTROL);
        changes.apply(&mut template, fail).unwrap();
        assert!(template.render().ends_with("Description: B\n\nPackage: blah-doc\nArchitecture: all\n"));
    }

    #[test]
    fn test_removed_paragraph_is_dropped() {
        let base = doc(CONTROL);
        let mut edited = base.clone();
        edited.remove(1).unwrap();
        let changes = ChangeSet::between(&base, &edited);

        let mut template = doc(CONTROL);
        changes.apply(&mut template, fail).unwrap();
        assert_eq!(template.render(), "Source: blah\nBuild-Depends: debhelper-compat (= 13)\n");
    }
}
