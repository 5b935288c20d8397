//! Machine-readable debian/copyright handler

use crate::deb822::{Document, FieldOrder, Paragraph};
use crate::error::Result;
use crate::format::{Format, FormatHandler};

/// Handler for `debian/copyright` in the machine-readable format
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyrightHandler;

impl CopyrightHandler {
    pub fn new() -> Self {
        Self
    }
}

fn assign_orders(doc: &mut Document) {
    for (index, paragraph) in doc.paragraphs_mut().iter_mut().enumerate() {
        let order = if index == 0 && paragraph.contains("Format") {
            FieldOrder::CopyrightHeader
        } else if paragraph.contains("Files") {
            FieldOrder::CopyrightFiles
        } else if paragraph.contains("License") {
            FieldOrder::CopyrightLicense
        } else {
            FieldOrder::Unordered
        };
        paragraph.set_order(order);
    }
}

impl FormatHandler for CopyrightHandler {
    type Document = Document;

    fn format(&self) -> Format {
        Format::Copyright
    }

    fn parse(&self, source: &str) -> Result<Document> {
        let mut doc = Document::parse(source)?;
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
}

/// Header, Files and License paragraph access on a copyright document
pub trait CopyrightFile {
    /// The header paragraph, when the first paragraph has a `Format` field
    fn header(&self) -> Option<&Paragraph>;

    fn header_mut(&mut self) -> Option<&mut Paragraph>;

    fn files_paragraphs(&self) -> impl Iterator<Item = &Paragraph>;

    /// Standalone license paragraphs (a `License` field without `Files`)
    fn license_paragraphs(&self) -> impl Iterator<Item = &Paragraph>;

    /// Standalone license paragraph whose synopsis is `name`
    fn find_license(&self, name: &str) -> Option<&Paragraph>;
}

/// First line of a `License` value
fn license_synopsis(value: &str) -> &str {
    value.lines().next().unwrap_or_default().trim()
}

impl CopyrightFile for Document {
    fn header(&self) -> Option<&Paragraph> {
        self.paragraph(0).filter(|p| p.contains("Format"))
    }

    fn header_mut(&mut self) -> Option<&mut Paragraph> {
        self.paragraph_mut(0).filter(|p| p.contains("Format"))
    }

    fn files_paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs().iter().filter(|p| p.contains("Files"))
    }

    fn license_paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs()
            .iter()
            .enumerate()
            .filter(|(index, p)| {
                !(*index == 0 && p.contains("Format")) && !p.contains("Files") && p.contains("License")
            })
            .map(|(_, p)| p)
    }

    fn find_license(&self, name: &str) -> Option<&Paragraph> {
        self.license_paragraphs()
            .find(|p| p.get("License").is_some_and(|v| license_synopsis(v) == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COPYRIGHT: &str = "\
Format: https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/
Upstream-Name: blah

Files: *
Copyright: 2020 Jane <jane@example.com>
License: GPL-2+

Files: debian/*
Copyright: 2021 Joe <joe@example.com>
License: GPL-2+

License: GPL-2+
 This program is free software.
";

    fn parse() -> Document {
        CopyrightHandler::new().parse(COPYRIGHT).unwrap()
    }

    #[test]
    fn test_paragraph_kinds() {
        let doc = parse();
        assert_eq!(doc.header().unwrap().get("Upstream-Name"), Some("blah"));
        assert_eq!(doc.files_paragraphs().count(), 2);
        assert_eq!(doc.license_paragraphs().count(), 1);
    }

    #[test]
    fn test_find_license() {
        let doc = parse();
        let license = doc.find_license("GPL-2+").unwrap();
        assert!(license.get("License").unwrap().contains("free software"));
        assert!(doc.find_license("MIT").is_none());
    }

    #[test]
    fn test_header_field_order() {
        let mut doc = parse();
        doc.header_mut()
            .unwrap()
            .set("Upstream-Contact", "Jane <jane@example.com>")
            .unwrap();
        assert!(doc.render().contains(
            "Upstream-Name: blah\nUpstream-Contact: Jane <jane@example.com>\n\nFiles: *"
        ));
    }
}
