//! Line-based deb822 parser that keeps every byte it reads

use super::document::{Document, LineEnding};
use super::field::Field;
use super::paragraph::{Entry, Paragraph};
use crate::error::{Error, Result};

/// How lines that are neither fields nor comments are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Strict,
    /// Keep unknown lines as opaque template tokens
    Template,
}

/// Split text into lines without terminators.
///
/// Returns the lines, the detected line ending and whether the text ended
/// with a newline.
pub(crate) fn split_lines(text: &str) -> (Vec<String>, LineEnding, bool) {
    let final_newline = text.ends_with('\n');
    let eol = match text.find('\n') {
        Some(pos) if text[..pos].ends_with('\r') => LineEnding::CrLf,
        _ => LineEnding::Lf,
    };
    if text.is_empty() {
        return (Vec::new(), eol, false);
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    let lines = body
        .split('\n')
        .map(|line| match eol {
            LineEnding::CrLf => line.strip_suffix('\r').unwrap_or(line).to_string(),
            LineEnding::Lf => line.to_string(),
        })
        .collect();
    (lines, eol, final_newline)
}

struct PendingField {
    name: String,
    first: String,
    lines: Vec<String>,
    comments: Vec<String>,
}

impl PendingField {
    fn finish(self) -> Field {
        let mut value = self.first.trim_start().to_string();
        for line in &self.lines[1..] {
            value.push('\n');
            value.push_str(line);
        }
        let value = value.trim_end().to_string();
        Field::parsed(self.name, value, self.comments, self.lines)
    }
}

#[derive(Default)]
struct Parser {
    paragraphs: Vec<Paragraph>,
    current: Option<Paragraph>,
    field: Option<PendingField>,
    /// Blank and comment lines not yet attached to anything
    pending: Vec<String>,
}

impl Parser {
    fn finish_field(&mut self) {
        if let Some(field) = self.field.take() {
            let field = field.finish();
            if let Some(paragraph) = self.current.as_mut() {
                paragraph.entries.push(Entry::Field(field));
            }
        }
    }

    fn close_paragraph(&mut self) {
        self.finish_field();
        if let Some(mut paragraph) = self.current.take() {
            paragraph.trailing_comments = std::mem::take(&mut self.pending);
            self.paragraphs.push(paragraph);
        }
    }

    /// Start a paragraph if none is open, splitting pending lines into
    /// separators and the comments owned by the next entry.
    fn open_paragraph(&mut self) -> (&mut Paragraph, Vec<String>) {
        let comments = if self.current.is_none() {
            let split = self
                .pending
                .iter()
                .rposition(|l| !is_comment(l))
                .map_or(0, |i| i + 1);
            let comments = self.pending.split_off(split);
            self.current = Some(Paragraph {
                leading: std::mem::take(&mut self.pending),
                ..Paragraph::default()
            });
            comments
        } else {
            std::mem::take(&mut self.pending)
        };
        (self.current.get_or_insert_with(Paragraph::default), comments)
    }

    fn start_field(&mut self, lineno: usize, name: &str, rest: &str, line: &str) -> Result<()> {
        self.finish_field();
        let (paragraph, comments) = self.open_paragraph();
        if paragraph.contains(name) {
            return Err(Error::parse(lineno, format!("duplicate field {name}")));
        }
        let comments = if paragraph.entries.is_empty() {
            paragraph.comments = comments;
            Vec::new()
        } else {
            comments
        };
        self.field = Some(PendingField {
            name: name.to_string(),
            first: rest.to_string(),
            lines: vec![line.to_string()],
            comments,
        });
        Ok(())
    }

    fn push_token(&mut self, line: &str) {
        self.finish_field();
        let (paragraph, comments) = self.open_paragraph();
        paragraph.entries.push(Entry::Token {
            comments,
            line: line.to_string(),
        });
    }

    fn finish(mut self, eol: LineEnding, final_newline: bool) -> Document {
        if self.current.is_some() {
            self.close_paragraph();
        }
        Document::from_parts(self.paragraphs, self.pending, eol, final_newline)
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#')
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn split_field(line: &str) -> Option<(&str, &str)> {
    let (name, rest) = line.split_once(':')?;
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && !name.chars().any(|c| c.is_whitespace() || c.is_control());
    valid.then_some((name, rest))
}

/// Parse deb822 text.
pub fn parse(text: &str, mode: Mode) -> Result<Document> {
    let (lines, eol, final_newline) = split_lines(text);
    let mut parser = Parser::default();

    for (index, line) in lines.iter().enumerate() {
        let lineno = index + 1;
        if is_comment(line) {
            parser.finish_field();
            parser.pending.push(line.clone());
        } else if is_blank(line) {
            if parser.current.is_some() {
                parser.close_paragraph();
            }
            parser.pending.push(line.clone());
        } else if is_continuation(line) {
            let in_field = parser.field.is_some() && parser.pending.is_empty();
            if let Some(field) = parser.field.as_mut().filter(|_| in_field) {
                field.lines.push(line.clone());
            } else if mode == Mode::Template {
                parser.push_token(line);
            } else {
                return Err(Error::parse(lineno, "continuation line outside of a field"));
            }
        } else if let Some((name, rest)) = split_field(line) {
            parser.start_field(lineno, name, rest, line)?;
        } else if mode == Mode::Template {
            parser.push_token(line);
        } else {
            return Err(Error::parse(lineno, format!("expected a field, got {line:?}")));
        }
    }

    Ok(parser.finish(eol, final_newline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn logical_values() {
        let doc = parse(
            "Source: foo\nBuild-Depends:\n debhelper-compat (= 12),\n uuid-dev\nDescription:   short  \n",
            Mode::Strict,
        )
        .unwrap();
        let para = &doc.paragraphs()[0];
        assert_eq!(para.get("Source"), Some("foo"));
        assert_eq!(
            para.get("Build-Depends"),
            Some("\n debhelper-compat (= 12),\n uuid-dev")
        );
        assert_eq!(para.get("Description"), Some("short"));
    }

    #[test]
    fn comments_are_attached() {
        let doc = parse(
            "# header\n\n# about source\nSource: foo\n# about section\nSection: net\n# tail\n\nPackage: bar\n",
            Mode::Strict,
        )
        .unwrap();
        let source = &doc.paragraphs()[0];
        assert_eq!(source.leading, vec!["# header", ""]);
        assert_eq!(source.comments, vec!["# about source"]);
        assert_eq!(
            source.field("Section").unwrap().comments(),
            &["# about section".to_string()]
        );
        assert_eq!(source.trailing_comments, vec!["# tail"]);
        assert_eq!(doc.paragraphs()[1].leading, vec![""]);
    }

    #[test]
    fn duplicate_field_is_an_error() {
        let err = parse("Source: a\nSource: b\n", Mode::Strict).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn stray_line_is_an_error() {
        let err = parse("Source: a\n@OTHERSTUFF@\n", Mode::Strict).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn template_tokens_are_kept() {
        let text = "Source: a\nBuild-Depends: @cdbs@, foo\n\n@OTHERSTUFF@\n\nPackage: b\n";
        let doc = parse(text, Mode::Template).unwrap();
        assert_eq!(doc.template_tokens(), vec!["@OTHERSTUFF@"]);
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn continuation_after_comment_is_an_error() {
        let err = parse("Depends: a,\n# note\n b\n", Mode::Strict).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }));
    }

    #[test]
    fn split_lines_detects_crlf() {
        let (lines, eol, final_newline) = split_lines("a: b\r\nc: d");
        assert_eq!(lines, vec!["a: b", "c: d"]);
        assert_eq!(eol, LineEnding::CrLf);
        assert!(!final_newline);
    }
}
