//! lintian override files
//!
//! Each content line is `[[package][ [archlist]][ type]: ]tag[ info]`. Tags
//! and info may use `*` and `?` wildcards.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::lines::{LineDocument, LineEntry, LineHandler};
use crate::format::Format;

/// Package type an override applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideType {
    Source,
    Binary,
    Udeb,
}

impl OverrideType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Binary => "binary",
            Self::Udeb => "udeb",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "source" => Some(Self::Source),
            "binary" => Some(Self::Binary),
            "udeb" => Some(Self::Udeb),
            _ => None,
        }
    }
}

/// A single override
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LintianOverride {
    pub package: Option<String>,
    pub archlist: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub kind: Option<OverrideType>,
    pub tag: String,
    pub info: Option<String>,
}

/// Match `text` against a shell-style pattern using `*` and `?`.
fn wildcard_matches(pattern: &str, text: &str) -> bool {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            c => expr.push_str(&regex::escape(&c.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).is_ok_and(|re| re.is_match(text))
}

impl LintianOverride {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Whether this override covers an issue.
    ///
    /// Criteria passed as `None` are not checked.
    pub fn matches(
        &self,
        package: Option<&str>,
        tag: Option<&str>,
        info: Option<&str>,
        arch: Option<&str>,
        kind: Option<OverrideType>,
    ) -> bool {
        if let (Some(own), Some(other)) = (&self.package, package) {
            if own != other {
                return false;
            }
        }
        if let (Some(own), Some(other)) = (self.kind, kind) {
            if own != other {
                return false;
            }
        }
        if let Some(tag) = tag {
            if !self.tag.is_empty() && !wildcard_matches(&self.tag, tag) {
                return false;
            }
        }
        if let (Some(own), Some(info)) = (&self.info, info) {
            if !wildcard_matches(own, info) {
                return false;
            }
        }
        if let (Some(archlist), Some(arch)) = (&self.archlist, arch) {
            if !archlist.is_empty() && !archlist.iter().any(|a| a == arch) {
                return false;
            }
        }
        true
    }
}

impl LineEntry for LintianOverride {
    const FORMAT: Format = Format::LintianOverrides;

    fn parse_line(line: &str) -> Result<Option<Self>, String> {
        if line.starts_with('#') || line.trim().is_empty() {
            return Ok(None);
        }
        let line = line.trim();
        let mut entry = Self::default();

        let issue = match line.split_once(": ") {
            Some((origin, issue)) => {
                let mut origin = origin.trim();
                while !origin.is_empty() {
                    if let Some(rest) = origin.strip_prefix('[') {
                        let (archs, rest) = rest
                            .split_once(']')
                            .ok_or_else(|| format!("unterminated architecture list in {line:?}"))?;
                        entry.archlist = Some(archs.split_whitespace().map(str::to_string).collect());
                        origin = rest.trim();
                    } else {
                        let (word, rest) = origin.split_once(' ').unwrap_or((origin, ""));
                        match OverrideType::from_word(word) {
                            Some(kind) => entry.kind = Some(kind),
                            None => entry.package = Some(word.to_string()),
                        }
                        origin = rest.trim();
                    }
                }
                issue
            }
            None => line,
        };

        match issue.split_once(char::is_whitespace) {
            Some((tag, info)) => {
                entry.tag = tag.to_string();
                entry.info = Some(info.trim().to_string());
            }
            None => entry.tag = issue.to_string(),
        }
        Ok(Some(entry))
    }

    fn render_line(&self) -> String {
        let mut origin = Vec::new();
        if let Some(package) = &self.package {
            origin.push(package.clone());
        }
        if let Some(archlist) = self.archlist.as_ref().filter(|a| !a.is_empty()) {
            origin.push(format!("[{}]", archlist.join(" ")));
        }
        if let Some(kind) = self.kind {
            origin.push(kind.as_str().to_string());
        }
        let mut line = if origin.is_empty() {
            self.tag.clone()
        } else {
            format!("{}: {}", origin.join(" "), self.tag)
        };
        if let Some(info) = &self.info {
            line.push(' ');
            line.push_str(info);
        }
        line
    }
}

pub type LintianOverridesHandler = LineHandler<LintianOverride>;

impl LineDocument<LintianOverride> {
    /// Whether an override for `tag` (and optionally `info` and `package`) exists
    pub fn override_exists(&self, tag: &str, info: Option<&str>, package: Option<&str>) -> bool {
        self.entries()
            .any(|o| o.matches(package, Some(tag), info, None, None))
    }

    /// Remove every override for which `matches` returns true.
    pub fn remove_matching(&mut self, mut matches: impl FnMut(&LintianOverride) -> bool) -> usize {
        self.retain(|o| !matches(o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHandler;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse_one(line: &str) -> LintianOverride {
        LintianOverride::parse_line(line).unwrap().unwrap()
    }

    #[rstest]
    #[case("some-tag", None, None, None, "some-tag", None)]
    #[case("foo source: some-tag", Some("foo"), None, Some(OverrideType::Source), "some-tag", None)]
    #[case("foo [amd64 i386]: some-tag exact info", Some("foo"), Some(vec!["amd64", "i386"]), None, "some-tag", Some("exact info"))]
    #[case("binary: some-tag *", None, None, Some(OverrideType::Binary), "some-tag", Some("*"))]
    fn test_parse(
        #[case] line: &str,
        #[case] package: Option<&str>,
        #[case] archlist: Option<Vec<&str>>,
        #[case] kind: Option<OverrideType>,
        #[case] tag: &str,
        #[case] info: Option<&str>,
    ) {
        let parsed = parse_one(line);
        assert_eq!(parsed.package.as_deref(), package);
        assert_eq!(
            parsed.archlist,
            archlist.map(|a| a.into_iter().map(str::to_string).collect())
        );
        assert_eq!(parsed.kind, kind);
        assert_eq!(parsed.tag, tag);
        assert_eq!(parsed.info.as_deref(), info);
    }

    #[test]
    fn test_comments_are_raw() {
        assert!(LintianOverride::parse_line("# why").unwrap().is_none());
        assert!(LintianOverride::parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn test_wildcards() {
        let o = parse_one("some-tag usr/lib/*.so");
        assert!(o.matches(None, Some("some-tag"), Some("usr/lib/libfoo.so"), None, None));
        assert!(!o.matches(None, Some("some-tag"), Some("usr/bin/foo"), None, None));
        assert!(!o.matches(None, Some("other-tag"), None, None, None));
    }

    #[test]
    fn test_override_exists() {
        let doc = LineDocument::<LintianOverride>::parse(
            "# keep\nfoo binary: some-tag\nother-tag [usr/share/*]\n",
        )
        .unwrap();
        assert!(doc.override_exists("some-tag", None, Some("foo")));
        assert!(!doc.override_exists("some-tag", None, Some("bar")));
        assert!(doc.override_exists("other-tag", Some("[usr/share/doc]"), None));
    }

    #[test]
    fn test_render_new_override() {
        let handler = LintianOverridesHandler::new();
        let mut doc = handler.parse("# keep\n").unwrap();
        doc.push(LintianOverride {
            package: Some("foo".into()),
            archlist: Some(vec!["amd64".into()]),
            kind: Some(OverrideType::Binary),
            tag: "some-tag".into(),
            info: Some("extra".into()),
        });
        assert_eq!(
            handler.render(&doc),
            "# keep\nfoo [amd64] binary: some-tag extra\n"
        );
    }

    #[test]
    fn test_remove_matching_keeps_comments() {
        let mut doc =
            LineDocument::<LintianOverride>::parse("# a\nsome-tag\n# b\nother-tag\n").unwrap();
        assert_eq!(doc.remove_matching(|o| o.tag == "some-tag"), 1);
        assert_eq!(doc.render(), "# a\n# b\nother-tag\n");
    }
}
