//! debian/control handler

use std::path::Path;

use crate::deb822::{Document, FieldOrder, Paragraph};
use crate::error::{Error, Result};
use crate::format::{Format, FormatHandler};

/// Handler for `debian/control` and `debian/control.in`
#[derive(Debug, Default, Clone, Copy)]
pub struct ControlHandler;

impl ControlHandler {
    pub fn new() -> Self {
        Self
    }
}

/// Pick the canonical field order for every paragraph of a control file
fn assign_orders(doc: &mut Document) {
    for (index, paragraph) in doc.paragraphs_mut().iter_mut().enumerate() {
        let order = if index == 0 && paragraph.contains("Source") {
            FieldOrder::Source
        } else if paragraph.contains("Package") {
            FieldOrder::Binary
        } else {
            FieldOrder::Unordered
        };
        paragraph.set_order(order);
    }
}

impl FormatHandler for ControlHandler {
    type Document = Document;

    fn format(&self) -> Format {
        Format::Control
    }

    fn parse(&self, source: &str) -> Result<Document> {
        let mut doc = Document::parse(source)?;
        assign_orders(&mut doc);
        Ok(doc)
    }

    fn parse_template(&self, source: &str) -> Result<Document> {
        let mut doc = Document::parse_template(source)?;
        assign_orders(&mut doc);
        Ok(doc)
    }

    fn empty(&self) -> Document {
        Document::new()
    }

    fn render(&self, doc: &Document) -> String {
        doc.render()
    }

    fn normalize(&self, doc: &Document) -> serde_json::Value {
        doc.normalize()
    }

    /// An existing control file must open with a source paragraph, even
    /// when it holds nothing but comments.
    fn validate(&self, doc: &Document, path: &Path) -> Result<()> {
        match doc.paragraph(0) {
            Some(first) if first.contains("Source") => Ok(()),
            _ => Err(Error::MissingSourceParagraph {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Source and binary paragraph access on a control document
pub trait ControlFile {
    /// The source paragraph, when the first paragraph has a `Source` field
    fn source(&self) -> Option<&Paragraph>;

    fn source_mut(&mut self) -> Option<&mut Paragraph>;

    /// Binary package paragraphs in file order
    fn binaries(&self) -> impl Iterator<Item = &Paragraph>;

    fn binaries_mut(&mut self) -> impl Iterator<Item = &mut Paragraph>;

    fn binary(&self, name: &str) -> Option<&Paragraph>;

    fn binary_mut(&mut self, name: &str) -> Option<&mut Paragraph>;

    /// Append a binary package paragraph.
    fn add_binary(&mut self, paragraph: Paragraph);

    /// Remove the paragraph of binary package `name`.
    fn remove_binary(&mut self, name: &str) -> Result<Paragraph>;

    /// Sort binary paragraphs by package name, leaving the first
    /// `keep_first` binaries in place.
    fn sort_binaries(&mut self, keep_first: usize);
}

impl ControlFile for Document {
    fn source(&self) -> Option<&Paragraph> {
        self.paragraph(0).filter(|p| p.contains("Source"))
    }

    fn source_mut(&mut self) -> Option<&mut Paragraph> {
        self.paragraph_mut(0).filter(|p| p.contains("Source"))
    }

    fn binaries(&self) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs().iter().filter(|p| p.contains("Package"))
    }

    fn binaries_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.paragraphs_mut()
            .iter_mut()
            .filter(|p| p.contains("Package"))
    }

    fn binary(&self, name: &str) -> Option<&Paragraph> {
        self.find("Package", name)
    }

    fn binary_mut(&mut self, name: &str) -> Option<&mut Paragraph> {
        self.find_mut("Package", name)
    }

    fn add_binary(&mut self, paragraph: Paragraph) {
        tracing::debug!(package = ?paragraph.get("Package"), "adding binary paragraph");
        self.push(paragraph.with_order(FieldOrder::Binary));
    }

    fn remove_binary(&mut self, name: &str) -> Result<Paragraph> {
        let index = self
            .paragraphs()
            .iter()
            .position(|p| p.get("Package") == Some(name))
            .ok_or_else(|| Error::ParagraphNotFound {
                key: format!("Package: {name}"),
            })?;
        self.remove(index)
    }

    fn sort_binaries(&mut self, keep_first: usize) {
        let skip = 1 + keep_first;
        self.sort_paragraphs(skip, |p| p.get("Package").map(str::to_string));
    }
}
