//! Format-preserving editing of Debian packaging files
//!
//! Parses `debian/control`, `debian/copyright`, changelogs, watch files and
//! the other files below `debian/` into editable models that render back
//! byte for byte. Edits go through a scoped [`Editor`] that refuses to write
//! output it cannot represent faithfully and follows generated files back to
//! their templates.

pub mod deb822;
pub mod debhelper;
pub mod diff;
pub mod editor;
pub mod error;
pub mod format;
pub mod generated;
pub mod handlers;
pub mod lists;
pub mod reformat;
pub mod relations;
pub mod vcs;
pub mod version;

pub use diff::{SemanticChange, SemanticDiff};
pub use editor::{CommitOutcome, ControlEditor, Editor, EditorOptions, edit_control, edit_file};
pub use error::{Error, Result};
pub use format::{Format, FormatHandler};
pub use generated::{GeneratedLink, Provenance, TemplateKind};
pub use handlers::{
    ChangelogHandler, ControlFile, ControlHandler, CopyrightFile, CopyrightHandler, Deb822Handler,
    DebcargoHandler, DottedKeys, LintianOverridesHandler, MaintscriptHandler, RulesHandler,
    SeriesHandler, WatchHandler,
};
pub use vcs::VcsUrl;
pub use version::{Version, parse_version};
