//! A whole deb822 file

use serde::{Deserialize, Serialize};

use super::paragraph::Paragraph;
use super::parse::{self, Mode};
use crate::error::{Error, Result};

/// Number of leading lines searched for the `DO NOT EDIT` marker
pub const DO_NOT_EDIT_SCAN_LINES: usize = 20;

/// Line terminator used when rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Whether one of the first lines of a text carries a `DO NOT EDIT` marker
pub fn has_do_not_edit_marker(text: &str) -> bool {
    text.lines()
        .take(DO_NOT_EDIT_SCAN_LINES)
        .any(|line| line.contains("DO NOT EDIT"))
}

/// A parsed deb822 file.
///
/// Rendering an unmodified document reproduces the input exactly, as long as
/// it uses a single line ending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    paragraphs: Vec<Paragraph>,
    /// Blank lines and comments after the last paragraph
    trailing: Vec<String>,
    eol: LineEnding,
    final_newline: bool,
    do_not_edit: bool,
}

impl Document {
    pub fn new() -> Self {
        Self {
            final_newline: true,
            ..Self::default()
        }
    }

    pub(crate) fn from_parts(
        paragraphs: Vec<Paragraph>,
        trailing: Vec<String>,
        eol: LineEnding,
        final_newline: bool,
    ) -> Self {
        Self {
            paragraphs,
            trailing,
            eol,
            final_newline,
            do_not_edit: false,
        }
    }

    /// Parse a regular deb822 file.
    pub fn parse(text: &str) -> Result<Self> {
        let mut doc = parse::parse(text, Mode::Strict)?;
        doc.do_not_edit = has_do_not_edit_marker(text);
        Ok(doc)
    }

    /// Parse a template, keeping unknown lines as tokens.
    pub fn parse_template(text: &str) -> Result<Self> {
        let mut doc = parse::parse(text, Mode::Template)?;
        doc.do_not_edit = has_do_not_edit_marker(text);
        Ok(doc)
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for paragraph in &self.paragraphs {
            if paragraph.is_empty()
                && paragraph.comments.is_empty()
                && paragraph.trailing_comments.is_empty()
            {
                continue;
            }
            paragraph.render_into(&mut lines);
        }
        lines.extend(self.trailing.iter().cloned());

        let eol = self.eol.as_str();
        let mut out = lines.join(eol);
        if self.final_newline && !lines.is_empty() {
            out.push_str(eol);
        }
        out
    }

    pub fn line_ending(&self) -> LineEnding {
        self.eol
    }

    pub fn has_final_newline(&self) -> bool {
        self.final_newline
    }

    /// Whether the file says it must not be edited by hand
    pub fn is_marked_generated(&self) -> bool {
        self.do_not_edit
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn paragraphs_mut(&mut self) -> &mut [Paragraph] {
        &mut self.paragraphs
    }

    pub fn paragraph(&self, index: usize) -> Option<&Paragraph> {
        self.paragraphs.get(index)
    }

    pub fn paragraph_mut(&mut self, index: usize) -> Option<&mut Paragraph> {
        self.paragraphs.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// First paragraph whose `field` equals `value`
    pub fn find(&self, field: &str, value: &str) -> Option<&Paragraph> {
        self.paragraphs.iter().find(|p| p.get(field) == Some(value))
    }

    pub fn find_mut(&mut self, field: &str, value: &str) -> Option<&mut Paragraph> {
        self.paragraphs
            .iter_mut()
            .find(|p| p.get(field) == Some(value))
    }

    /// Append a paragraph, separated from the previous one by a blank line.
    pub fn push(&mut self, paragraph: Paragraph) {
        let index = self.paragraphs.len();
        self.insert(index, paragraph);
    }

    /// Insert a paragraph at `index`.
    pub fn insert(&mut self, index: usize, mut paragraph: Paragraph) {
        let index = index.min(self.paragraphs.len());
        if self.paragraphs.is_empty() {
            self.final_newline = true;
        } else if index == 0 {
            let first = &mut self.paragraphs[0];
            paragraph.leading = std::mem::take(&mut first.leading);
            first.leading = vec![String::new()];
        } else if paragraph.leading.is_empty() {
            paragraph.leading = vec![String::new()];
        }
        if index == self.paragraphs.len() {
            self.final_newline = true;
        }
        self.paragraphs.insert(index, paragraph);
    }

    /// Remove the paragraph at `index`.
    ///
    /// When the first paragraph goes, its separator lines are handed to the
    /// new first paragraph so the file does not start with a blank line.
    pub fn remove(&mut self, index: usize) -> Result<Paragraph> {
        if index >= self.paragraphs.len() {
            return Err(Error::ParagraphNotFound {
                key: format!("#{index}"),
            });
        }
        let mut removed = self.paragraphs.remove(index);
        if index == 0
            && let Some(next) = self.paragraphs.first_mut()
        {
            next.leading = std::mem::take(&mut removed.leading);
        }
        Ok(removed)
    }

    /// Keep only the paragraphs for which `keep` returns true.
    ///
    /// The separators of a dropped first paragraph go to the first kept one.
    pub fn retain(&mut self, mut keep: impl FnMut(&Paragraph) -> bool) {
        let mut leading = None;
        let mut kept = Vec::with_capacity(self.paragraphs.len());
        for mut paragraph in std::mem::take(&mut self.paragraphs) {
            if keep(&paragraph) {
                if let Some(leading) = leading.take() {
                    paragraph.leading = leading;
                }
                kept.push(paragraph);
            } else if kept.is_empty() {
                leading.get_or_insert(paragraph.leading);
            }
        }
        self.paragraphs = kept;
    }

    /// Stable sort of the paragraphs after the first `skip` ones.
    ///
    /// Separator lines travel with their paragraph.
    pub fn sort_paragraphs<K: Ord>(&mut self, skip: usize, key: impl FnMut(&Paragraph) -> K) {
        if skip >= self.paragraphs.len() {
            return;
        }
        self.paragraphs[skip..].sort_by_key(key);
    }

    /// Template token lines in document order
    pub fn template_tokens(&self) -> Vec<&str> {
        self.paragraphs.iter().flat_map(Paragraph::tokens).collect()
    }

    /// Field values of every non-empty paragraph
    pub fn normalize(&self) -> serde_json::Value {
        let paragraphs = self
            .paragraphs
            .iter()
            .filter(|p| p.fields().next().is_some())
            .map(Paragraph::normalize)
            .collect();
        serde_json::json!({ "paragraphs": serde_json::Value::Array(paragraphs) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("Source: foo\n")]
    #[case("Source: foo")]
    #[case("Source: foo\r\nSection: net\r\n\r\nPackage: foo\r\n")]
    #[case("Source: foo  \nMaintainer:Joe <joe@example.com>\n")]
    #[case("\n\n# leading\nSource: foo\n\n\n\nPackage: foo\n# trailing\n\n")]
    #[case("Source: foo\nBuild-Depends:\n debhelper-compat (= 12),\n uuid-dev\n")]
    #[case("Source: foo\nDescription: x\n long\n .\n more\n")]
    fn unmodified_render_is_identical(#[case] text: &str) {
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn editing_one_field_leaves_other_paragraphs_untouched() {
        let text = "Source: foo\nSection:  net\n\nPackage:   foo\nArchitecture: any\n";
        let mut doc = Document::parse(text).unwrap();
        doc.paragraph_mut(0)
            .unwrap()
            .set("Section", "web")
            .unwrap();
        assert_eq!(
            doc.render(),
            "Source: foo\nSection: web\n\nPackage:   foo\nArchitecture: any\n"
        );
    }

    #[test]
    fn crlf_is_kept_for_new_lines() {
        let mut doc = Document::parse("Source: foo\r\n").unwrap();
        doc.paragraph_mut(0)
            .unwrap()
            .set("Section", "net")
            .unwrap();
        assert_eq!(doc.render(), "Source: foo\r\nSection: net\r\n");
    }

    #[test]
    fn removing_field_drops_its_comments_only() {
        let text = "# about the source\nSource: foo\n# about section\nSection: net\nPriority: optional\n";
        let mut doc = Document::parse(text).unwrap();
        let para = doc.paragraph_mut(0).unwrap();
        para.remove("Section").unwrap();
        para.remove("Source").unwrap();
        assert_eq!(doc.render(), "# about the source\nPriority: optional\n");
    }

    #[test]
    fn push_separates_with_blank_line() {
        let mut doc = Document::parse("Source: foo").unwrap();
        doc.push(Paragraph::from_fields([("Package", "foo")]));
        assert_eq!(doc.render(), "Source: foo\n\nPackage: foo\n");
    }

    #[test]
    fn removing_first_paragraph_keeps_file_start() {
        let mut doc = Document::parse("Source: foo\n\nPackage: foo\n").unwrap();
        doc.remove(0).unwrap();
        assert_eq!(doc.render(), "Package: foo\n");
    }

    #[test]
    fn retain_moves_separators_to_first_kept_paragraph() {
        let mut doc =
            Document::parse("# header\n\nSource: foo\n\nPackage: a\n\nPackage: b\n\nPackage: c\n").unwrap();
        doc.retain(|p| p.get("Package").is_some_and(|name| name != "a"));
        assert_eq!(doc.render(), "# header\n\nPackage: b\n\nPackage: c\n");
    }

    #[test]
    fn empty_paragraphs_are_not_rendered() {
        let mut doc = Document::parse("Source: foo\n\nPackage: foo\n").unwrap();
        doc.paragraph_mut(1).unwrap().remove("Package").unwrap();
        assert_eq!(doc.render(), "Source: foo\n");
        assert_eq!(
            doc.normalize(),
            serde_json::json!({"paragraphs": [{"Source": "foo"}]})
        );
    }

    #[test]
    fn do_not_edit_marker() {
        let doc = Document::parse("# DO NOT EDIT: generated from control.in\nSource: foo\n").unwrap();
        assert!(doc.is_marked_generated());
        let doc = Document::parse("Source: foo\n").unwrap();
        assert!(!doc.is_marked_generated());
    }

    #[test]
    fn normalize_uses_field_values() {
        let doc = Document::parse("Source: foo\n\nPackage: bar\nDepends: a,\n b\n").unwrap();
        assert_eq!(
            doc.normalize(),
            serde_json::json!({
                "paragraphs": [
                    {"Source": "foo"},
                    {"Package": "bar", "Depends": "a,\n b"}
                ]
            })
        );
    }
}
