//! Format-preserving deb822 model
//!
//! Files are split into paragraphs of `Name: value` fields. Every line that
//! is read is kept, including comments, blank separators and the exact
//! spelling of untouched fields, so a document that was not modified renders
//! back to the bytes it was parsed from.

mod changes;
mod document;
mod field;
mod order;
mod paragraph;
mod parse;

pub use changes::{ChangeSet, Conflict, FieldChange, ParagraphKey};
pub use document::{DO_NOT_EDIT_SCAN_LINES, Document, LineEnding, has_do_not_edit_marker};
pub use field::Field;
pub use order::FieldOrder;
pub use paragraph::{Entry, Paragraph, validate_name};
pub use parse::{Mode, parse};
pub(crate) use parse::split_lines;
