//! Line-oriented files where every content line is one entry
//!
//! Series files, lintian overrides and maintscripts share this model. Lines
//! that are not entries (comments, blank lines, unknown directives) are kept
//! verbatim, and an entry renders its original text until it is modified.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;

use crate::deb822::{LineEnding, split_lines};
use crate::error::{Error, Result};
use crate::format::{Format, FormatHandler};

/// An entry type of a line-oriented format
pub trait LineEntry: Clone + PartialEq + Serialize {
    const FORMAT: Format;

    /// Parse one line. `Ok(None)` keeps the line as raw text.
    fn parse_line(line: &str) -> std::result::Result<Option<Self>, String>;

    /// Render a new or modified entry
    fn render_line(&self) -> String;
}

/// A single line of a line-oriented file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Line<E> {
    Raw(String),
    Entry {
        entry: E,
        /// Entry as parsed, with the text it was parsed from
        #[serde(skip)]
        original: Option<(E, String)>,
    },
}

impl<E: LineEntry> Line<E> {
    fn render(&self) -> String {
        match self {
            Self::Raw(line) => line.clone(),
            Self::Entry {
                entry,
                original: Some((parsed, raw)),
            } if parsed == entry => raw.clone(),
            Self::Entry { entry, .. } => entry.render_line(),
        }
    }
}

pub(crate) fn join_lines(lines: &[String], eol: LineEnding, final_newline: bool) -> String {
    let mut out = lines.join(eol.as_str());
    if final_newline && !lines.is_empty() {
        out.push_str(eol.as_str());
    }
    out
}

/// A parsed line-oriented file
#[derive(Debug, Clone, PartialEq)]
pub struct LineDocument<E> {
    lines: Vec<Line<E>>,
    eol: LineEnding,
    final_newline: bool,
}

impl<E> Default for LineDocument<E> {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            eol: LineEnding::Lf,
            final_newline: true,
        }
    }
}

impl<E: LineEntry> LineDocument<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let (raw_lines, eol, final_newline) = split_lines(text);
        let mut lines = Vec::with_capacity(raw_lines.len());
        for (index, raw) in raw_lines.into_iter().enumerate() {
            match E::parse_line(&raw).map_err(|message| Error::parse(index + 1, message))? {
                Some(entry) => lines.push(Line::Entry {
                    original: Some((entry.clone(), raw)),
                    entry,
                }),
                None => lines.push(Line::Raw(raw)),
            }
        }
        Ok(Self {
            lines,
            eol,
            final_newline,
        })
    }

    pub fn render(&self) -> String {
        let lines: Vec<String> = self.lines.iter().map(Line::render).collect();
        join_lines(&lines, self.eol, self.final_newline)
    }

    pub fn lines(&self) -> &[Line<E>] {
        &self.lines
    }

    pub fn entries(&self) -> impl Iterator<Item = &E> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { entry, .. } => Some(entry),
            Line::Raw(_) => None,
        })
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut E> {
        self.lines.iter_mut().filter_map(|line| match line {
            Line::Entry { entry, .. } => Some(entry),
            Line::Raw(_) => None,
        })
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries().nth(index)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Append an entry at the end of the file.
    pub fn push(&mut self, entry: E) {
        self.lines.push(Line::Entry {
            entry,
            original: None,
        });
        self.final_newline = true;
    }

    /// Remove the entry at `index` (counting entries only).
    pub fn remove(&mut self, index: usize) -> Option<E> {
        let position = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| matches!(line, Line::Entry { .. }))
            .nth(index)
            .map(|(position, _)| position)?;
        match self.lines.remove(position) {
            Line::Entry { entry, .. } => Some(entry),
            Line::Raw(_) => None,
        }
    }

    /// Keep the entries for which `keep` returns true; returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&E) -> bool) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| match line {
            Line::Entry { entry, .. } => keep(entry),
            Line::Raw(_) => true,
        });
        before - self.lines.len()
    }

    /// Entries as JSON, ignoring comments and formatting
    pub fn normalize(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.entries()
                .map(|entry| serde_json::to_value(entry).unwrap_or(serde_json::Value::Null))
                .collect(),
        )
    }
}

/// Handler for any [`LineEntry`] format
pub struct LineHandler<E>(PhantomData<fn() -> E>);

impl<E> LineHandler<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for LineHandler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for LineHandler<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for LineHandler<E> {}

impl<E> fmt::Debug for LineHandler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LineHandler").field(&std::any::type_name::<E>()).finish()
    }
}

impl<E: LineEntry> FormatHandler for LineHandler<E> {
    type Document = LineDocument<E>;

    fn format(&self) -> Format {
        E::FORMAT
    }

    fn parse(&self, source: &str) -> Result<LineDocument<E>> {
        LineDocument::parse(source)
    }

    fn empty(&self) -> LineDocument<E> {
        LineDocument::new()
    }

    fn render(&self, doc: &LineDocument<E>) -> String {
        doc.render()
    }

    fn normalize(&self, doc: &LineDocument<E>) -> serde_json::Value {
        doc.normalize()
    }
}
