//! Paragraphs: ordered fields plus the comments and separators around them

use serde::{Deserialize, Serialize};

use super::field::Field;
use super::order::FieldOrder;
use crate::error::{Error, Result};

/// Something that occupies lines inside a paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    Field(Field),
    /// A template substitution line such as `@OTHERSTUFF@`, with the
    /// comments directly above it
    Token {
        comments: Vec<String>,
        line: String,
    },
}

/// Strip trailing whitespace from every line of a value; it cannot be
/// written back.
fn trim_value(value: String) -> String {
    value
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

/// A deb822 paragraph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Blank lines and detached comments before the paragraph
    pub(crate) leading: Vec<String>,
    /// Comments directly above the first field
    pub(crate) comments: Vec<String>,
    pub(crate) entries: Vec<Entry>,
    /// Comments after the last field
    pub(crate) trailing_comments: Vec<String>,
    #[serde(skip)]
    pub(crate) order: FieldOrder,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a paragraph from name/value pairs, in the given order.
    pub fn from_fields<N, V>(fields: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        let entries = fields
            .into_iter()
            .map(|(n, v)| Entry::Field(Field::new(n, v)))
            .collect();
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn order(&self) -> FieldOrder {
        self.order
    }

    /// Select the canonical order used for fields added later
    pub fn set_order(&mut self, order: FieldOrder) {
        self.order = order;
    }

    pub fn with_order(mut self, order: FieldOrder) -> Self {
        self.order = order;
        self
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Field(f) => Some(f),
            Entry::Token { .. } => None,
        })
    }

    fn fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.entries.iter_mut().filter_map(|e| match e {
            Entry::Field(f) => Some(f),
            Entry::Token { .. } => None,
        })
    }

    /// Template token lines, in order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Token { line, .. } => Some(line.as_str()),
            Entry::Field(_) => None,
        })
    }

    /// Field names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields().map(Field::name)
    }

    /// Name/value pairs in order
    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields().map(|f| (f.name(), f.value()))
    }

    pub fn len(&self) -> usize {
        self.fields().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().find(|f| f.is_named(name))
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields_mut().find(|f| f.is_named(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.field(name).map(Field::value)
    }

    /// Like [`Paragraph::get`], failing with `FieldNotFound`.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| Error::field_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Set a field, inserting it when missing.
    ///
    /// An existing field keeps its name spelling and position. A new field is
    /// placed according to the paragraph's canonical order; unknown names are
    /// appended, except that a trailing `Description` stays last.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let value = trim_value(value.into());
        if let Some(field) = self.field_mut(name) {
            field.set_value(value);
            return Ok(());
        }
        validate_name(name)?;
        let index = self.insertion_index(name);
        self.entries.insert(index, Entry::Field(Field::new(name, value)));
        Ok(())
    }

    /// Replace an existing field's value, failing with `FieldNotFound`.
    pub fn replace(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.field_mut(name)
            .ok_or_else(|| Error::field_not_found(name))?
            .set_value(trim_value(value.into()));
        Ok(())
    }

    /// Remove a field and its own comments, returning its value.
    pub fn remove(&mut self, name: &str) -> Result<String> {
        self.take(name).ok_or_else(|| Error::field_not_found(name))
    }

    /// Remove a field if present.
    pub fn take(&mut self, name: &str) -> Option<String> {
        let index = self
            .entries
            .iter()
            .position(|e| matches!(e, Entry::Field(f) if f.is_named(name)))?;
        match self.entries.remove(index) {
            Entry::Field(field) => Some(field.value().to_string()),
            Entry::Token { .. } => None,
        }
    }

    /// Rename a field in place.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        validate_name(new)?;
        self.field_mut(old)
            .ok_or_else(|| Error::field_not_found(old))?
            .set_name(new);
        Ok(())
    }

    fn insertion_index(&self, name: &str) -> usize {
        let last_field = self
            .entries
            .iter()
            .rposition(|e| matches!(e, Entry::Field(_)));

        if let Some(rank) = self.order.rank(name) {
            let before = self.entries.iter().position(|e| match e {
                Entry::Field(f) => self.order.rank(f.name()).is_some_and(|r| r > rank),
                Entry::Token { .. } => false,
            });
            if let Some(index) = before {
                return index;
            }
        }

        match last_field {
            Some(index) => match &self.entries[index] {
                Entry::Field(f) if f.is_named("Description") => index,
                _ => index + 1,
            },
            None => self.entries.len(),
        }
    }

    pub(crate) fn render_into(&self, out: &mut Vec<String>) {
        out.extend(self.leading.iter().cloned());
        out.extend(self.comments.iter().cloned());
        for entry in &self.entries {
            match entry {
                Entry::Field(field) => {
                    out.extend(field.comments().iter().cloned());
                    out.extend(field.render_lines());
                }
                Entry::Token { comments, line } => {
                    out.extend(comments.iter().cloned());
                    out.push(line.clone());
                }
            }
        }
        out.extend(self.trailing_comments.iter().cloned());
    }

    /// Field values keyed by name, for semantic comparison
    pub fn normalize(&self) -> serde_json::Value {
        let map = self
            .fields()
            .map(|f| (f.name().to_string(), serde_json::Value::from(f.value())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Check that a name can be written as a field name
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('#')
        && !name.starts_with('-')
        && !name.contains(':')
        && !name.chars().any(|c| c.is_whitespace() || c.is_control());
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidFieldName {
            name: name.to_string(),
        })
    }
}
