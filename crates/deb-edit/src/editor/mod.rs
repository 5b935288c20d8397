//! Scoped, transactional editing of a single file
//!
//! An [`Editor`] is opened on a path, hands out the parsed document for
//! mutation and is then either committed or dropped. Nothing is written
//! before [`Editor::commit`] has checked that the new content can be
//! rendered without damaging the file.

mod control;

pub use control::{ControlEditor, edit_control};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::FormatHandler;
use crate::generated::{self, Provenance};
use crate::reformat::{check_preserve_formatting, check_reinterpretation};

/// Behaviour switches for an editing session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorOptions {
    /// Accept output that differs from the original outside the edited fields
    #[serde(default)]
    pub allow_reformatting: bool,
    /// Write files that are marked as generated
    #[serde(default)]
    pub allow_generated: bool,
    /// Start from an empty document when the file does not exist
    #[serde(default)]
    pub allow_missing: bool,
    /// Shell command regenerating templated files, overriding detection
    #[serde(default)]
    pub regenerate_command: Option<String>,
}

impl EditorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_reformatting(mut self, allow: bool) -> Self {
        self.allow_reformatting = allow;
        self
    }

    pub fn allow_generated(mut self, allow: bool) -> Self {
        self.allow_generated = allow;
        self
    }

    pub fn allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }

    pub fn regenerate_command(mut self, command: impl Into<String>) -> Self {
        self.regenerate_command = Some(command.into());
        self
    }
}

/// Result of a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum CommitOutcome {
    /// The document was not modified; nothing was written
    Unchanged,
    /// Files that were written, removed or regenerated
    Changed { files: Vec<PathBuf> },
}

impl CommitOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    pub fn changed_files(&self) -> &[PathBuf] {
        match self {
            Self::Unchanged => &[],
            Self::Changed { files } => files,
        }
    }
}

/// An open editing session on one file
pub struct Editor<H: FormatHandler> {
    handler: H,
    path: PathBuf,
    options: EditorOptions,
    provenance: Provenance,
    /// File content at open time; `None` when the file did not exist
    original: Option<String>,
    checksum: Option<String>,
    baseline: H::Document,
    /// Rendering of the unmodified document
    rewritten: String,
    document: H::Document,
    template: bool,
    finished: bool,
}

impl<H: FormatHandler> Editor<H> {
    /// Open `path`, resolving its provenance before reading it.
    pub fn open(path: impl AsRef<Path>, handler: H, options: EditorOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let template = path
            .extension()
            .is_some_and(|ext| ext == "in" || ext == "m4");
        let provenance = if template {
            Provenance::Plain
        } else {
            generated::resolve(&path, handler.format(), options.regenerate_command.as_deref())?
        };

        let original = deb_fs::read_text_if_exists(&path)?;
        let baseline = match &original {
            Some(text) => {
                let doc = if template {
                    handler.parse_template(text)
                } else {
                    handler.parse(text)
                }
                .map_err(|e| e.with_path(&path))?;
                handler.validate(&doc, &path)?;
                doc
            }
            None if options.allow_missing => handler.empty(),
            None => return Err(Error::NotFound { path }),
        };
        let rewritten = handler.render(&baseline);
        if original.as_deref().is_some_and(|text| text != rewritten) {
            tracing::debug!(path = %path.display(), "serializer does not reproduce file");
        }
        let checksum = original.as_deref().map(deb_fs::compute_content_checksum);

        tracing::debug!(path = %path.display(), format = %handler.format(), "opened for editing");
        Ok(Self {
            handler,
            path,
            options,
            provenance,
            original,
            checksum,
            document: baseline.clone(),
            baseline,
            rewritten,
            template,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Document as it was when the file was opened
    pub fn baseline(&self) -> &H::Document {
        &self.baseline
    }

    pub fn document(&self) -> &H::Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut H::Document {
        &mut self.document
    }

    /// Whether committing now would write anything
    pub fn has_changed(&self) -> bool {
        !self.is_unchanged(&self.handler.render(&self.document))
    }

    /// Write the document back.
    ///
    /// An unmodified document leaves the file untouched. Every check runs
    /// before the file is replaced, so a failed commit writes nothing.
    pub fn commit(mut self) -> Result<CommitOutcome> {
        self.commit_in_place()
    }

    fn commit_in_place(&mut self) -> Result<CommitOutcome> {
        self.finished = true;
        let output = self.handler.render(&self.document);
        if self.is_unchanged(&output) {
            tracing::debug!(path = %self.path.display(), "no changes to write");
            return Ok(CommitOutcome::Unchanged);
        }
        self.check_generated()?;
        self.check_output(&output)?;
        self.check_unmodified_on_disk()?;
        deb_fs::write_atomic(&self.path, output.as_bytes())?;
        tracing::debug!(path = %self.path.display(), "committed");
        Ok(CommitOutcome::Changed {
            files: vec![self.path.clone()],
        })
    }

    /// Discard all changes.
    pub fn cancel(mut self) {
        self.finished = true;
        tracing::debug!(path = %self.path.display(), "edit cancelled");
    }

    fn is_unchanged(&self, output: &str) -> bool {
        output == self.rewritten || self.original.as_deref() == Some(output)
    }

    fn check_generated(&self) -> Result<()> {
        if self.options.allow_generated {
            return Ok(());
        }
        match &self.provenance {
            Provenance::Plain => Ok(()),
            Provenance::Template(link) => Err(Error::generated(
                &self.path,
                Some(link.template.clone()),
                "edit the template instead",
            )),
            Provenance::MarkedGenerated => Err(Error::generated(
                &self.path,
                None,
                "file is marked DO NOT EDIT",
            )),
        }
    }

    /// Run the reinterpretation and baseline checks on rendered output
    fn check_output(&self, output: &str) -> Result<()> {
        let original = self.original.as_deref().unwrap_or("");
        check_reinterpretation(
            &self.handler,
            &self.document,
            output,
            original,
            &self.path,
            self.template,
        )?;
        if let Some(original) = &self.original {
            check_preserve_formatting(
                &self.rewritten,
                original,
                &self.path,
                self.options.allow_reformatting,
            )?;
        }
        Ok(())
    }

    fn check_unmodified_on_disk(&self) -> Result<()> {
        let current = deb_fs::compute_file_checksum(&self.path)?;
        if current != self.checksum {
            return Err(Error::conflict(
                &self.path,
                "file was modified since it was opened",
            ));
        }
        Ok(())
    }
}

impl<H: FormatHandler> Drop for Editor<H> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(path = %self.path.display(), "editor dropped without commit, changes discarded");
        }
    }
}

impl<H: FormatHandler> std::fmt::Debug for Editor<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("path", &self.path)
            .field("format", &self.handler.format())
            .field("provenance", &self.provenance)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Open `path`, apply `edit` and commit.
///
/// When `edit` fails the file is left untouched and its error is returned.
pub fn edit_file<H, F>(path: impl AsRef<Path>, options: EditorOptions, edit: F) -> Result<CommitOutcome>
where
    H: FormatHandler + Default,
    F: FnOnce(&mut H::Document) -> Result<()>,
{
    let mut editor = Editor::open(path, H::default(), options)?;
    edit(editor.document_mut())?;
    editor.commit()
}
