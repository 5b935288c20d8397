//! quilt `debian/patches/series` files

use serde::Serialize;

use super::lines::{LineDocument, LineEntry, LineHandler};
use crate::format::Format;

/// One patch in a series file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesEntry {
    pub name: String,
    pub options: Vec<String>,
    /// Listed but commented out (`# foo.patch`)
    pub commented: bool,
}

impl SeriesEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
            commented: false,
        }
    }
}

impl LineEntry for SeriesEntry {
    const FORMAT: Format = Format::Series;

    fn parse_line(line: &str) -> Result<Option<Self>, String> {
        let (body, commented) = match line.strip_prefix('#') {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        let mut words = body.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let options: Vec<String> = words.map(str::to_string).collect();
        // Prose comments are not disabled patches
        if commented && options.iter().any(|o| !o.starts_with('-')) {
            return Ok(None);
        }
        Ok(Some(Self {
            name: name.to_string(),
            options,
            commented,
        }))
    }

    fn render_line(&self) -> String {
        let mut line = String::new();
        if self.commented {
            line.push_str("# ");
        }
        line.push_str(&self.name);
        for option in &self.options {
            line.push(' ');
            line.push_str(option);
        }
        line
    }
}

pub type SeriesHandler = LineHandler<SeriesEntry>;

impl LineDocument<SeriesEntry> {
    /// Names of the active patches, in application order
    pub fn patches(&self) -> impl Iterator<Item = &str> {
        self.entries()
            .filter(|e| !e.commented)
            .map(|e| e.name.as_str())
    }

    /// Append a patch with its quilt options.
    pub fn append_patch(&mut self, name: &str, options: &[&str]) {
        self.push(SeriesEntry {
            name: name.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            commented: false,
        });
    }

    /// Remove a patch by name; returns whether it was listed.
    pub fn remove_patch(&mut self, name: &str) -> bool {
        self.retain(|e| e.name != name) > 0
    }
}

/// Extension of a file name, leading dots excluded (`.quiltrc` has none)
fn extension(name: &str) -> &str {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    match name[stem_start..].rfind('.') {
        Some(index) => &name[stem_start + index..],
        None => "",
    }
}

/// The suffix most patches in `debian/patches` use, or `default` when
/// there are no patches.
///
/// The series file, `00list` and READMEs are not patches. Ties go to the
/// suffix seen first.
pub fn find_common_patch_suffix<'a>(names: impl IntoIterator<Item = &'a str>, default: &'a str) -> &'a str {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for name in names {
        if name == "series" || name == "00list" || name.starts_with("README") {
            continue;
        }
        let suffix = extension(name);
        match counts.iter_mut().find(|(s, _)| *s == suffix) {
            Some((_, count)) => *count += 1,
            None => counts.push((suffix, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (suffix, count) in counts {
        if best.is_none_or(|(_, most)| count > most) {
            best = Some((suffix, count));
        }
    }
    best.map_or(default, |(suffix, _)| suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHandler;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const SERIES: &str = "\
# Upstream fixes
fix-build.patch
#disabled.patch
install-path.patch -p0
";

    #[test]
    fn test_roundtrip() {
        let handler = SeriesHandler::new();
        let doc = handler.parse(SERIES).unwrap();
        assert_eq!(handler.render(&doc), SERIES);
    }

    #[test]
    fn test_patches_skip_commented() {
        let doc = LineDocument::<SeriesEntry>::parse(SERIES).unwrap();
        let patches: Vec<_> = doc.patches().collect();
        assert_eq!(patches, vec!["fix-build.patch", "install-path.patch"]);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_append_and_remove() {
        let mut doc = LineDocument::<SeriesEntry>::parse(SERIES).unwrap();
        doc.append_patch("new.patch", &[]);
        assert!(doc.remove_patch("fix-build.patch"));
        assert!(!doc.remove_patch("fix-build.patch"));
        assert_eq!(
            doc.render(),
            "# Upstream fixes\n#disabled.patch\ninstall-path.patch -p0\nnew.patch\n"
        );
    }

    #[test]
    fn test_modified_entry_is_rerendered() {
        let mut doc = LineDocument::<SeriesEntry>::parse("a.patch   -p1\n").unwrap();
        assert_eq!(doc.render(), "a.patch   -p1\n");
        if let Some(entry) = doc.entries_mut().next() {
            entry.options.clear();
        }
        assert_eq!(doc.render(), "a.patch\n");
    }

    #[rstest]
    #[case(&["series", "a.patch", "b.patch", "c.diff"], ".patch")]
    #[case(&["series", "00list", "README.source", "a.diff"], ".diff")]
    #[case(&["a.diff", "b.patch"], ".diff")]
    #[case(&["series"], ".patch")]
    #[case(&["no-suffix", "also-none", "x.patch"], "")]
    #[case(&[".quiltrc", ".hidden"], "")]
    fn test_common_patch_suffix(#[case] names: &[&str], #[case] expected: &str) {
        assert_eq!(find_common_patch_suffix(names.iter().copied(), ".patch"), expected);
    }
}
