//! Editing of `debian/control`, following templates it is generated from

use std::path::Path;

use super::{CommitOutcome, Editor, EditorOptions};
use crate::deb822::{ChangeSet, Document};
use crate::error::{Error, Result};
use crate::format::{Format, FormatHandler};
use crate::generated::{self, GeneratedLink, Provenance, TemplateKind, resolve_cdbs_conflict};
use crate::handlers::ControlHandler;
use crate::reformat::{check_preserve_formatting, check_reinterpretation};

/// Editor for a control file that may be generated from a template.
///
/// When the control file comes from `control.in` (or `control.m4`), changes
/// made to the control file are replayed on the template, and the control
/// file is regenerated from it. A missing control file with a template next
/// to it is expanded for the duration of the edit and removed again.
#[derive(Debug)]
pub struct ControlEditor {
    inner: Editor<ControlHandler>,
    /// The control file only exists because it was expanded on open
    template_only: bool,
    finished: bool,
}

impl ControlEditor {
    pub fn open(path: impl AsRef<Path>, options: EditorOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut template_only = false;
        if !path.exists() {
            let provenance =
                generated::resolve(path, Format::Control, options.regenerate_command.as_deref())?;
            if let Some(link) = provenance.link() {
                if !link.is_expandable() || link.kind == TemplateKind::Cdbs {
                    return Err(Error::generated(
                        path,
                        Some(link.template.clone()),
                        format!("unable to expand {} template", link.kind),
                    ));
                }
                tracing::debug!(template = %link.template.display(), "expanding missing control file");
                generated::regenerate(link)?;
                template_only = true;
            }
        }
        let inner = match Editor::open(path, ControlHandler::new(), options) {
            Ok(inner) => inner,
            Err(e) => {
                if template_only {
                    discard_expanded(path);
                }
                return Err(e);
            }
        };
        Ok(Self {
            inner,
            template_only,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn provenance(&self) -> &Provenance {
        self.inner.provenance()
    }

    pub fn document(&self) -> &Document {
        self.inner.document()
    }

    pub fn document_mut(&mut self) -> &mut Document {
        self.inner.document_mut()
    }

    /// Field changes made since the file was opened
    pub fn changes(&self) -> ChangeSet {
        ChangeSet::between(self.inner.baseline(), self.inner.document())
    }

    pub fn has_changed(&self) -> bool {
        self.inner.has_changed()
    }

    pub fn commit(mut self) -> Result<CommitOutcome> {
        self.finished = true;
        let result = self.commit_inner();
        if self.template_only {
            discard_expanded(self.inner.path());
        }
        result
    }

    pub fn cancel(mut self) {
        self.finished = true;
        if self.template_only {
            discard_expanded(self.inner.path());
        }
        tracing::debug!(path = %self.inner.path().display(), "edit cancelled");
    }

    fn commit_inner(&mut self) -> Result<CommitOutcome> {
        let Some(link) = self.inner.provenance().link().cloned() else {
            return self.inner.commit_in_place();
        };
        let inner = &mut self.inner;
        inner.finished = true;

        let output = inner.handler.render(&inner.document);
        if inner.is_unchanged(&output) {
            tracing::debug!(path = %inner.path.display(), "no changes to write");
            return Ok(CommitOutcome::Unchanged);
        }
        if !link.is_expandable() {
            return Err(Error::generated(
                &inner.path,
                Some(link.template.clone()),
                format!("unable to update {} template", link.kind),
            ));
        }
        inner.check_output(&output)?;
        inner.check_unmodified_on_disk()?;

        let changes = ChangeSet::between(&inner.baseline, &inner.document);
        if !update_template(&link, &changes, &inner.options)? {
            tracing::debug!(template = %link.template.display(), "template unchanged");
            return Ok(CommitOutcome::Unchanged);
        }
        if self.template_only {
            return Ok(CommitOutcome::Changed {
                files: vec![link.template.clone()],
            });
        }
        let files = vec![link.template.clone(), inner.path.clone()];

        if link.kind == TemplateKind::Cdbs {
            deb_fs::write_atomic(&inner.path, output.as_bytes())?;
        } else {
            generated::regenerate(&link)?;
            verify_regenerated(&link, &changes)?;
        }
        tracing::debug!(path = %inner.path.display(), template = %link.template.display(), "committed through template");
        Ok(CommitOutcome::Changed { files })
    }
}

impl Drop for ControlEditor {
    fn drop(&mut self) {
        if !self.finished && self.template_only {
            discard_expanded(self.inner.path());
        }
    }
}

fn discard_expanded(path: &Path) {
    if let Err(e) = deb_fs::remove_if_exists(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove expanded control file");
    }
}

/// Replay `changes` on the template; returns whether the template changed.
fn update_template(link: &GeneratedLink, changes: &ChangeSet, options: &EditorOptions) -> Result<bool> {
    let handler = ControlHandler::new();
    let path = link.template.as_path();
    let original = deb_fs::read_text(path)?;
    let mut template = handler
        .parse_template(&original)
        .map_err(|e| e.with_path(path))?;
    let rewritten = handler.render(&template);

    if link.kind == TemplateKind::Cdbs {
        changes.apply(&mut template, |conflict| resolve_cdbs_conflict(conflict, path))?;
    } else {
        changes.apply(&mut template, |conflict| Err(conflict.to_error(path)))?;
    }

    let output = handler.render(&template);
    if output == original || output == rewritten {
        return Ok(false);
    }
    check_reinterpretation(&handler, &template, &output, &original, path, true)?;
    check_preserve_formatting(&rewritten, &original, path, options.allow_reformatting)?;
    deb_fs::write_atomic(path, output.as_bytes())?;
    Ok(true)
}

/// Check that the regenerated control file carries every change
fn verify_regenerated(link: &GeneratedLink, changes: &ChangeSet) -> Result<()> {
    let text = deb_fs::read_text(&link.target)?;
    let doc = ControlHandler::new()
        .parse(&text)
        .map_err(|e| e.with_path(&link.target))?;
    for (key, fields) in changes.iter() {
        let paragraph = doc.find(&key.field, &key.value);
        for change in fields {
            let actual = paragraph.and_then(|p| p.get(&change.field));
            if actual != change.new.as_deref() {
                return Err(Error::generated(
                    &link.target,
                    Some(link.template.clone()),
                    format!(
                        "regenerated file diverged: {key} field {} is {actual:?}, expected {:?}",
                        change.field, change.new
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Open a control file, apply `edit` and commit, following templates.
pub fn edit_control<F>(path: impl AsRef<Path>, options: EditorOptions, edit: F) -> Result<CommitOutcome>
where
    F: FnOnce(&mut Document) -> Result<()>,
{
    let mut editor = ControlEditor::open(path, options)?;
    edit(editor.document_mut())?;
    editor.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ControlFile;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn package(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("debian")).unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_plain_control() {
        let dir = package(&[("debian/control", "Source: blah\n")]);
        let path = dir.path().join("debian/control");
        let outcome = edit_control(&path, EditorOptions::new(), |doc| {
            doc.source_mut().unwrap().set("Rules-Requires-Root", "no")
        })
        .unwrap();
        assert_eq!(outcome.changed_files(), &[path.clone()]);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Source: blah\nRules-Requires-Root: no\n"
        );
    }

    #[test]
    fn test_cdbs_template() {
        let dir = package(&[
            ("debian/control", "Source: blah\nBuild-Depends: cdbs, debhelper\n"),
            ("debian/control.in", "Source: blah\nBuild-Depends: @cdbs@\n"),
        ]);
        let path = dir.path().join("debian/control");
        let outcome = edit_control(&path, EditorOptions::new(), |doc| {
            let source = doc.source_mut().unwrap();
            source.set("Build-Depends", "cdbs, debhelper, libfoo-dev")?;
            source.set("Rules-Requires-Root", "no")
        })
        .unwrap();
        assert_eq!(
            outcome.changed_files(),
            &[dir.path().join("debian/control.in"), path.clone()]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("debian/control.in")).unwrap(),
            "Source: blah\nBuild-Depends: @cdbs@, libfoo-dev\nRules-Requires-Root: no\n"
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Source: blah\nBuild-Depends: cdbs, debhelper, libfoo-dev\nRules-Requires-Root: no\n"
        );
    }

    #[test]
    fn test_conflicting_template_value() {
        let control = "Source: blah\nMaintainer: Jane <jane@example.com>\n";
        let template = "Source: blah\nMaintainer: @MAINTAINER@\n";
        let dir = package(&[("debian/control", control), ("debian/control.in", template)]);
        let path = dir.path().join("debian/control");
        let options = EditorOptions::new().regenerate_command("true");
        let err = edit_control(&path, options, |doc| {
            doc.source_mut().unwrap().set("Maintainer", "Joe <joe@example.com>")
        })
        .unwrap_err();
        assert!(matches!(err, Error::ChangeConflict { .. }));
        assert_eq!(fs::read_to_string(dir.path().join("debian/control.in")).unwrap(), template);
        assert_eq!(fs::read_to_string(&path).unwrap(), control);
    }

    #[test]
    fn test_unknown_template_is_refused() {
        let dir = package(&[
            ("debian/control", "Source: blah\n"),
            ("debian/control.in", "Source: blah\n"),
        ]);
        let path = dir.path().join("debian/control");
        let err = edit_control(&path, EditorOptions::new(), |doc| {
            doc.source_mut().unwrap().set("Section", "devel")
        })
        .unwrap_err();
        assert!(matches!(err, Error::GeneratedFile { template: Some(_), .. }));
    }

    #[test]
    fn test_noop_on_generated_file() {
        let dir = package(&[
            ("debian/control", "Source: blah\n"),
            ("debian/control.in", "Source: blah\n"),
        ]);
        let path = dir.path().join("debian/control");
        let outcome = edit_control(&path, EditorOptions::new(), |_| Ok(())).unwrap();
        assert_eq!(outcome, CommitOutcome::Unchanged);
    }
}
