//! Detection of edits whose formatting cannot be preserved
//!
//! Two checks run before anything is written. The baseline check compares
//! what the serializer produces for the unmodified file with the file itself.
//! The reinterpretation check parses the rendered output again and makes
//! sure it means what the caller intended.

use std::path::Path;

use crate::diff::{SemanticDiff, unified_diff};
use crate::error::{Error, Result};
use crate::format::FormatHandler;

/// Check that the serializer reproduces a file.
///
/// `rewritten` is the rendering of the unmodified parse of `original`.
/// Differences are tolerated only when reformatting is allowed.
pub fn check_preserve_formatting(
    rewritten: &str,
    original: &str,
    path: &Path,
    allow_reformatting: bool,
) -> Result<()> {
    if rewritten == original {
        return Ok(());
    }
    if allow_reformatting {
        tracing::debug!(path = %path.display(), "reformatting allowed, skipping baseline check");
        return Ok(());
    }
    Err(Error::FormattingUnpreservable {
        path: path.to_path_buf(),
        location: format!("line {}", first_differing_line(original, rewritten)),
        diff: unified_diff(original, rewritten),
    })
}

/// Check that rendered output parses back into the intended document.
pub fn check_reinterpretation<H: FormatHandler>(
    handler: &H,
    intended: &H::Document,
    rendered: &str,
    original: &str,
    path: &Path,
    template: bool,
) -> Result<()> {
    let reparsed = if template {
        handler.parse_template(rendered)
    } else {
        handler.parse(rendered)
    };
    let unpreservable = |location: String| Error::FormattingUnpreservable {
        path: path.to_path_buf(),
        location,
        diff: unified_diff(original, rendered),
    };

    let reparsed = match reparsed {
        Ok(doc) => doc,
        Err(Error::Parse { line, message, .. }) => {
            tracing::debug!(path = %path.display(), line, %message, "rendered output does not parse");
            return Err(unpreservable(format!("line {line}")));
        }
        Err(e) => return Err(e),
    };

    let diff = SemanticDiff::compute(&handler.normalize(intended), &handler.normalize(&reparsed));
    if diff.is_equivalent() {
        return Ok(());
    }
    let location = diff.first_path().unwrap_or("document").to_string();
    tracing::debug!(path = %path.display(), %location, "rendered output changes meaning");
    Err(unpreservable(location))
}

/// 1-based number of the first line that differs between two texts
fn first_differing_line(a: &str, b: &str) -> usize {
    let mut a_lines = a.split_inclusive('\n');
    let mut b_lines = b.split_inclusive('\n');
    let mut line = 1;
    loop {
        match (a_lines.next(), b_lines.next()) {
            (Some(x), Some(y)) if x == y => line += 1,
            _ => return line,
        }
    }
}
