//! A single `Name: value` field

use serde::{Deserialize, Serialize};

/// Text of a field as it was read from disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Original {
    name: String,
    value: String,
    lines: Vec<String>,
}

/// A field of a deb822 paragraph.
///
/// The value is the logical value: the text after the colon with the
/// leading blanks of the first line and all trailing whitespace removed.
/// Continuation lines keep their exact text and are joined with `\n`, so a
/// value starting with `\n` had an empty first line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    value: String,
    comments: Vec<String>,
    original: Option<Original>,
}

impl Field {
    /// Create a field that did not come from a file
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comments: Vec::new(),
            original: None,
        }
    }

    pub(crate) fn parsed(
        name: String,
        value: String,
        comments: Vec<String>,
        lines: Vec<String>,
    ) -> Self {
        Self {
            original: Some(Original {
                name: name.clone(),
                value: value.clone(),
                lines,
            }),
            name,
            value,
            comments,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Rename the field; the value is kept.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Comment lines directly above the field, removed together with it
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn set_comments(&mut self, comments: Vec<String>) {
        self.comments = comments;
    }

    /// Whether the name matches, ignoring ASCII case
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Whether name or value differ from what was parsed
    pub fn is_modified(&self) -> bool {
        match &self.original {
            Some(original) => original.name != self.name || original.value != self.value,
            None => true,
        }
    }

    /// Value as parsed, `None` for fields added after parsing
    pub fn original_value(&self) -> Option<&str> {
        self.original.as_ref().map(|o| o.value.as_str())
    }

    /// Lines of the field itself, without its comments
    pub(crate) fn render_lines(&self) -> Vec<String> {
        if let Some(original) = &self.original {
            if original.name == self.name && original.value == self.value {
                return original.lines.clone();
            }
        }

        let mut parts = self.value.split('\n');
        let first = parts.next().unwrap_or_default();
        let mut lines = Vec::new();
        if first.is_empty() {
            lines.push(format!("{}:", self.name));
        } else {
            lines.push(format!("{}: {}", self.name, first));
        }
        lines.extend(parts.map(str::to_string));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_field_keeps_raw_lines() {
        let field = Field::parsed(
            "Depends".into(),
            "a,\n   b".into(),
            vec![],
            vec!["Depends:  a,".into(), "   b".into()],
        );
        assert!(!field.is_modified());
        assert_eq!(field.render_lines(), vec!["Depends:  a,", "   b"]);
    }

    #[test]
    fn modified_field_is_rendered() {
        let mut field = Field::parsed(
            "Depends".into(),
            "a".into(),
            vec![],
            vec!["Depends:   a".into()],
        );
        field.set_value("a, b");
        assert!(field.is_modified());
        assert_eq!(field.render_lines(), vec!["Depends: a, b"]);
    }

    #[test]
    fn empty_first_line_renders_bare_name() {
        let field = Field::new("Build-Depends", "\n debhelper-compat (= 12),\n uuid-dev");
        assert_eq!(
            field.render_lines(),
            vec!["Build-Depends:", " debhelper-compat (= 12),", " uuid-dev"]
        );
    }

    #[test]
    fn restoring_value_restores_raw_text() {
        let mut field = Field::parsed(
            "Section".into(),
            "net".into(),
            vec![],
            vec!["Section:net".into()],
        );
        field.set_value("web");
        field.set_value("net");
        assert_eq!(field.render_lines(), vec!["Section:net"]);
    }

    #[test]
    fn case_insensitive_name() {
        let field = Field::new("Build-Depends", "foo");
        assert!(field.is_named("build-depends"));
        assert!(!field.is_named("Depends"));
    }
}
