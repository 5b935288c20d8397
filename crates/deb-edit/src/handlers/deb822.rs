//! Generic deb822 handler

use crate::deb822::Document;
use crate::error::Result;
use crate::format::{Format, FormatHandler};

/// Handler for deb822 files without format-specific rules
#[derive(Debug, Default, Clone, Copy)]
pub struct Deb822Handler;

impl Deb822Handler {
    pub fn new() -> Self {
        Self
    }
}

impl FormatHandler for Deb822Handler {
    type Document = Document;

    fn format(&self) -> Format {
        Format::Deb822
    }

    fn parse(&self, source: &str) -> Result<Document> {
        Document::parse(source)
    }

    fn parse_template(&self, source: &str) -> Result<Document> {
        Document::parse_template(source)
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
