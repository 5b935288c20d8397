//! uscan `debian/watch` files
//!
//! Logical lines may be continued with a trailing backslash. The first
//! logical line declares the format version, `opts=...` lines on their own
//! set options for every entry and other lines are entries:
//! `[opts=...] url [matching-pattern [version [script]]]`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::lines::join_lines;
use crate::deb822::{LineEnding, split_lines};
use crate::error::{Error, Result};
use crate::format::{Format, FormatHandler};

static PATTERN_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/]*\([^/]*\)[^/]*)$").unwrap());

/// One download location
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WatchEntry {
    pub url: String,
    pub matching_pattern: Option<String>,
    pub version: Option<String>,
    pub script: Option<String>,
    pub options: Vec<String>,
}

fn option_key(option: &str) -> &str {
    option.split_once('=').map_or(option, |(key, _)| key)
}

fn find_option<'a>(options: &'a [String], name: &str) -> Option<&'a str> {
    options.iter().find(|o| option_key(o) == name).map(|o| {
        o.split_once('=').map_or("", |(_, value)| value)
    })
}

fn set_option(options: &mut Vec<String>, name: &str, value: Option<&str>) {
    let option = match value {
        Some(value) => format!("{name}={value}"),
        None => name.to_string(),
    };
    match options.iter_mut().find(|o| option_key(o) == name) {
        Some(existing) => *existing = option,
        None => options.push(option),
    }
}

fn delete_option(options: &mut Vec<String>, name: &str) -> bool {
    let before = options.len();
    options.retain(|o| option_key(o) != name);
    options.len() != before
}

fn render_options(options: &[String]) -> String {
    let joined = options.join(",");
    if joined.contains([' ', '\t']) {
        format!("opts=\"{joined}\"")
    } else {
        format!("opts={joined}")
    }
}

impl WatchEntry {
    pub fn new(url: impl Into<String>, matching_pattern: Option<String>) -> Self {
        Self {
            url: url.into(),
            matching_pattern,
            ..Self::default()
        }
    }

    /// Value of an option; options without a value yield `""`
    pub fn get_option(&self, name: &str) -> Option<&str> {
        find_option(&self.options, name)
    }

    pub fn set_option(&mut self, name: &str, value: Option<&str>) {
        set_option(&mut self.options, name, value);
    }

    pub fn del_option(&mut self, name: &str) -> bool {
        delete_option(&mut self.options, name)
    }

    fn render(&self) -> String {
        let mut parts = Vec::new();
        if !self.options.is_empty() {
            parts.push(render_options(&self.options));
        }
        parts.push(self.url.clone());
        parts.extend(
            [&self.matching_pattern, &self.version, &self.script]
                .into_iter()
                .flatten()
                .cloned(),
        );
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Raw(String),
    Version {
        version: u32,
        original: Option<(u32, Vec<String>)>,
    },
    Options {
        options: Vec<String>,
        original: Option<(Vec<String>, Vec<String>)>,
    },
    Entry {
        entry: WatchEntry,
        original: Option<(WatchEntry, Vec<String>)>,
    },
}

impl Item {
    fn render_into(&self, out: &mut Vec<String>) {
        match self {
            Self::Raw(line) => out.push(line.clone()),
            Self::Version {
                version,
                original: Some((parsed, raw)),
            } if parsed == version => out.extend(raw.iter().cloned()),
            Self::Version { version, .. } => out.push(format!("version={version}")),
            Self::Options {
                options,
                original: Some((parsed, raw)),
            } if parsed == options => out.extend(raw.iter().cloned()),
            Self::Options { options, .. } => out.push(render_options(options)),
            Self::Entry {
                entry,
                original: Some((parsed, raw)),
            } if parsed == entry => out.extend(raw.iter().cloned()),
            Self::Entry { entry, .. } => out.push(entry.render()),
        }
    }
}

/// Split a leading `opts=` clause off a logical line
fn split_options(line: &str, number: usize) -> Result<(Option<Vec<String>>, &str)> {
    let Some(rest) = line.strip_prefix("opts=") else {
        return Ok((None, line));
    };
    let (options, rest) = match rest.strip_prefix('"') {
        Some(quoted) => {
            let end = quoted
                .find('"')
                .ok_or_else(|| Error::parse(number, "unmatched quote in opts"))?;
            (&quoted[..end], &quoted[end + 1..])
        }
        None => rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, "")),
    };
    let options = options.split(',').map(str::to_string).collect();
    Ok((Some(options), rest.trim()))
}

fn parse_entry(line: &str, options: Option<Vec<String>>) -> WatchEntry {
    let (mut url, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(url, rest)| (url, rest.trim()));
    let mut parts: Vec<String> = Vec::new();
    if let Some(found) = PATTERN_IN_URL.captures(url).and_then(|c| c.get(1)) {
        parts.push(found.as_str().to_string());
        url = &url[..found.start() - 1];
        parts.extend(rest.splitn(2, char::is_whitespace).filter(|p| !p.is_empty()).map(str::to_string));
    } else {
        parts.extend(rest.splitn(3, char::is_whitespace).filter(|p| !p.is_empty()).map(str::to_string));
    }
    let mut parts = parts.into_iter();
    WatchEntry {
        url: url.trim().to_string(),
        matching_pattern: parts.next(),
        version: parts.next(),
        script: parts.next(),
        options: options.unwrap_or_default(),
    }
}

/// A parsed watch file
#[derive(Debug, Clone, PartialEq)]
pub struct WatchFile {
    items: Vec<Item>,
    eol: LineEnding,
    final_newline: bool,
}

impl Default for WatchFile {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            eol: LineEnding::Lf,
            final_newline: true,
        }
    }
}

impl WatchFile {
    /// An empty watch file declaring `version`
    pub fn new(version: u32) -> Self {
        Self {
            items: vec![Item::Version {
                version,
                original: None,
            }],
            ..Self::default()
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let (lines, eol, final_newline) = split_lines(text);
        let mut items = Vec::new();
        let mut version = None;
        let mut raw: Vec<String> = Vec::new();
        let mut chunks: Vec<String> = Vec::new();
        let mut start = 0;

        for (index, line) in lines.into_iter().enumerate() {
            if chunks.is_empty() && (line.starts_with('#') || line.trim().is_empty()) {
                items.push(Item::Raw(line));
                continue;
            }
            if chunks.is_empty() {
                start = index + 1;
            }
            let continued = line.ends_with('\\');
            let chunk = line.strip_suffix('\\').unwrap_or(&line).to_string();
            chunks.push(if version.is_some_and(|v| v > 3) {
                chunk.trim_start().to_string()
            } else {
                chunk
            });
            raw.push(line);
            if continued {
                continue;
            }
            let logical = std::mem::take(&mut chunks).concat();
            let logical = logical.trim();
            let raw_lines = std::mem::take(&mut raw);

            if version.is_none() {
                let number = logical
                    .strip_prefix("version")
                    .and_then(|rest| rest.trim_start().strip_prefix('='))
                    .and_then(|n| n.trim().parse::<u32>().ok())
                    .ok_or_else(|| Error::parse(start, "watch file must start with version=N"))?;
                version = Some(number);
                items.push(Item::Version {
                    version: number,
                    original: Some((number, raw_lines)),
                });
                continue;
            }

            let (options, rest) = split_options(logical, start)?;
            if rest.is_empty() {
                let options = options.unwrap_or_default();
                items.push(Item::Options {
                    original: Some((options.clone(), raw_lines)),
                    options,
                });
            } else {
                let entry = parse_entry(rest, options);
                items.push(Item::Entry {
                    original: Some((entry.clone(), raw_lines)),
                    entry,
                });
            }
        }
        if !chunks.is_empty() {
            tracing::warn!(line = start, "watch file ends with a continuation");
            return Err(Error::parse(start, "unterminated continuation line"));
        }

        Ok(Self {
            items,
            eol,
            final_newline,
        })
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for item in &self.items {
            item.render_into(&mut lines);
        }
        join_lines(&lines, self.eol, self.final_newline)
    }

    /// Declared format version, `None` for an empty file
    pub fn version(&self) -> Option<u32> {
        self.items.iter().find_map(|item| match item {
            Item::Version { version, .. } => Some(*version),
            _ => None,
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &WatchEntry> {
        self.items.iter().filter_map(|item| match item {
            Item::Entry { entry, .. } => Some(entry),
            _ => None,
        })
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut WatchEntry> {
        self.items.iter_mut().filter_map(|item| match item {
            Item::Entry { entry, .. } => Some(entry),
            _ => None,
        })
    }

    pub fn push_entry(&mut self, entry: WatchEntry) {
        self.items.push(Item::Entry {
            entry,
            original: None,
        });
        self.final_newline = true;
    }

    /// Options that apply to every entry
    pub fn options(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Options { options, .. } => Some(options),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Value of a file-wide option; options without a value yield `""`
    pub fn get_option(&self, name: &str) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            Item::Options { options, .. } => find_option(options, name),
            _ => None,
        })
    }

    /// Set a file-wide option, adding an `opts=` line after the version line
    /// when there is none yet.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) {
        let existing = self.items.iter().position(|item| match item {
            Item::Options { options, .. } => find_option(options, name).is_some(),
            _ => false,
        });
        let index = existing.or_else(|| {
            self.items
                .iter()
                .position(|item| matches!(item, Item::Options { .. }))
        });
        let index = match index {
            Some(index) => index,
            None => {
                let after_version = self
                    .items
                    .iter()
                    .position(|item| matches!(item, Item::Version { .. }))
                    .map_or(0, |i| i + 1);
                self.items.insert(
                    after_version,
                    Item::Options {
                        options: Vec::new(),
                        original: None,
                    },
                );
                after_version
            }
        };
        if let Item::Options { options, .. } = &mut self.items[index] {
            set_option(options, name, value);
        }
    }

    /// Remove a file-wide option; an emptied `opts=` line is dropped.
    pub fn del_option(&mut self, name: &str) -> bool {
        let mut removed = false;
        for item in &mut self.items {
            if let Item::Options { options, .. } = item {
                removed |= delete_option(options, name);
            }
        }
        self.items
            .retain(|item| !matches!(item, Item::Options { options, .. } if options.is_empty()));
        removed
    }

    pub fn normalize(&self) -> serde_json::Value {
        serde_json::json!({
            "version": self.version(),
            "options": self.options(),
            "entries": self.entries().collect::<Vec<_>>(),
        })
    }
}

/// Handler for `debian/watch`
#[derive(Debug, Default, Clone, Copy)]
pub struct WatchHandler;

impl WatchHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FormatHandler for WatchHandler {
    type Document = WatchFile;

    fn format(&self) -> Format {
        Format::Watch
    }

    fn parse(&self, source: &str) -> Result<WatchFile> {
        WatchFile::parse(source)
    }

    fn empty(&self) -> WatchFile {
        WatchFile::new(4)
    }

    fn render(&self, doc: &WatchFile) -> String {
        doc.render()
    }

    fn normalize(&self, doc: &WatchFile) -> serde_json::Value {
        doc.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WATCH: &str = "\
# Watch file for blah
version=4
opts=\"pgpmode=auto, dversionmangle=s/\\+ds//\" \\
  https://example.com/releases/ blah-(\\d[\\d.]*)\\.tar\\.gz
opts=repack
https://example.com/other/blah-([\\d.]+)\\.tar\\.xz debian uupdate
";

    #[test]
    fn test_roundtrip() {
        let watch = WatchFile::parse(WATCH).unwrap();
        assert_eq!(watch.render(), WATCH);
    }

    #[test]
    fn test_parse_entries() {
        let watch = WatchFile::parse(WATCH).unwrap();
        assert_eq!(watch.version(), Some(4));
        let entries: Vec<_> = watch.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://example.com/releases/");
        assert_eq!(entries[0].matching_pattern.as_deref(), Some("blah-(\\d[\\d.]*)\\.tar\\.gz"));
        assert_eq!(entries[0].get_option("pgpmode"), Some("auto"));
        assert_eq!(entries[1].url, "https://example.com/other");
        assert_eq!(entries[1].matching_pattern.as_deref(), Some("blah-([\\d.]+)\\.tar\\.xz"));
        assert_eq!(entries[1].version.as_deref(), Some("debian"));
        assert_eq!(entries[1].script.as_deref(), Some("uupdate"));
        assert_eq!(watch.get_option("repack"), Some(""));
    }

    #[test]
    fn test_edit_entry_option() {
        let mut watch = WatchFile::parse(WATCH).unwrap();
        if let Some(entry) = watch.entries_mut().nth(1) {
            entry.set_option("mode", Some("git"));
        }
        let rendered = watch.render();
        assert!(rendered.contains("  https://example.com/releases/"));
        assert!(rendered.ends_with(
            "opts=mode=git https://example.com/other blah-([\\d.]+)\\.tar\\.xz debian uupdate\n"
        ));
    }

    #[test]
    fn test_file_options() {
        let mut watch = WatchFile::parse("version=4\nhttps://example.com/ foo-(.*).tar.gz\n").unwrap();
        watch.set_option("repacksuffix", Some("+ds"));
        assert_eq!(
            watch.render(),
            "version=4\nopts=repacksuffix=+ds\nhttps://example.com/ foo-(.*).tar.gz\n"
        );
        assert!(watch.del_option("repacksuffix"));
        assert!(!watch.del_option("repacksuffix"));
        assert_eq!(watch.render(), "version=4\nhttps://example.com/ foo-(.*).tar.gz\n");
    }

    #[test]
    fn test_missing_version() {
        let err = WatchFile::parse("https://example.com/ foo\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn test_empty_file() {
        let watch = WatchFile::parse("# nothing\n").unwrap();
        assert_eq!(watch.version(), None);
        assert_eq!(watch.entries().count(), 0);
    }
}
