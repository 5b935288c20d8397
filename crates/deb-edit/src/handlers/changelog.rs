//! debian/changelog handler
//!
//! A changelog is a list of blocks, newest first. Each block has a header
//! line, change lines and a trailer line with the maintainer and date. The
//! header and trailer render their original text until modified; change
//! lines are kept as written.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::Serialize;

use super::lines::join_lines;
use crate::deb822::{LineEnding, split_lines};
use crate::error::{Error, Result};
use crate::format::{Format, FormatHandler};
use crate::version::{Version, parse_version};

/// Width that change lines are wrapped to
pub const WIDTH: usize = 80;
const INITIAL_INDENT: &str = "  * ";
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<package>\w[-+0-9a-z.]*) \((?P<version>[^ ()]+)\)(?P<distributions>(?:\s+[-+0-9a-zA-Z.]+)+)\s*;(?P<metadata>.*)$",
    )
    .unwrap()
});

static TRAILER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ -- (?P<maintainer>.*?) <(?P<email>[^>]*)>\s*(?P<date>.*?)\s*$").unwrap()
});

static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[ \t]*[+\-*] ").unwrap());

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<prefix>.*?)(?P<number>[0-9]+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Header {
    package: String,
    version: String,
    distributions: Vec<String>,
    metadata: String,
}

impl Header {
    fn parse(line: &str) -> Option<Self> {
        let caps = HEADER.captures(line)?;
        Some(Self {
            package: caps["package"].to_string(),
            version: caps["version"].to_string(),
            distributions: caps["distributions"]
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            metadata: caps["metadata"].trim().to_string(),
        })
    }

    fn render(&self) -> String {
        format!(
            "{} ({}) {}; {}",
            self.package,
            self.version,
            self.distributions.join(" "),
            self.metadata
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Trailer {
    maintainer: String,
    email: String,
    date: String,
}

impl Trailer {
    fn parse(line: &str) -> Option<Self> {
        let caps = TRAILER.captures(line)?;
        Some(Self {
            maintainer: caps["maintainer"].to_string(),
            email: caps["email"].to_string(),
            date: caps["date"].to_string(),
        })
    }

    fn render(&self) -> String {
        format!(" -- {} <{}>  {}", self.maintainer, self.email, self.date)
    }
}

/// One changelog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBlock {
    header: Header,
    header_raw: Option<(Header, String)>,
    changes: Vec<String>,
    trailer: Option<Trailer>,
    trailer_raw: Option<(Trailer, String)>,
    /// Blank lines and other text between the trailer and the next header
    after: Vec<String>,
}

impl ChangeBlock {
    pub fn package(&self) -> &str {
        &self.header.package
    }

    pub fn version_str(&self) -> &str {
        &self.header.version
    }

    pub fn version(&self) -> Result<Version> {
        parse_version(&self.header.version)
    }

    pub fn set_version(&mut self, version: &Version) {
        self.header.version = version.to_string();
    }

    pub fn distributions(&self) -> &[String] {
        &self.header.distributions
    }

    pub fn set_distributions(&mut self, distributions: &str) {
        self.header.distributions = distributions.split_whitespace().map(str::to_string).collect();
    }

    /// Value of `urgency=` in the header metadata
    pub fn urgency(&self) -> Option<&str> {
        self.header.metadata.split(',').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            key.trim().eq_ignore_ascii_case("urgency").then(|| value.trim())
        })
    }

    /// Whether the block has not been uploaded yet
    pub fn is_unreleased(&self) -> bool {
        self.header
            .distributions
            .iter()
            .any(|d| distribution_is_unreleased(d))
    }

    /// Lines between header and trailer, including the blank lines around them
    pub fn changes(&self) -> &[String] {
        &self.changes
    }

    /// Maintainer name and email from the trailer
    pub fn maintainer(&self) -> Option<(&str, &str)> {
        self.trailer
            .as_ref()
            .map(|t| (t.maintainer.as_str(), t.email.as_str()))
    }

    pub fn set_maintainer(&mut self, name: &str, email: &str) {
        let trailer = self.trailer.get_or_insert_with(|| Trailer {
            maintainer: String::new(),
            email: String::new(),
            date: String::new(),
        });
        trailer.maintainer = name.to_string();
        trailer.email = email.to_string();
    }

    pub fn date(&self) -> Option<&str> {
        self.trailer.as_ref().map(|t| t.date.as_str())
    }

    /// Trailer date, when it is valid RFC 2822
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc2822(self.date()?).ok()
    }

    pub fn set_date(&mut self, timestamp: DateTime<FixedOffset>) {
        let date = timestamp.format(DATE_FORMAT).to_string();
        match &mut self.trailer {
            Some(trailer) => trailer.date = date,
            None => {
                self.trailer = Some(Trailer {
                    maintainer: String::new(),
                    email: String::new(),
                    date,
                })
            }
        }
    }

    /// Add a change, wrapping it to the changelog width.
    ///
    /// The first line becomes a new `  * ` bullet; further lines are indented
    /// below it, keeping their own sub-bullets.
    pub fn add_change(&mut self, lines: &[&str]) {
        while self.changes.len() > 1
            && self.changes.last().is_some_and(|l| l.trim().is_empty())
        {
            self.changes.pop();
        }
        if self.changes.is_empty() {
            self.changes.push(String::new());
        }
        let Some((first, rest)) = lines.split_first() else {
            return;
        };
        self.changes.extend(wrap(first, INITIAL_INDENT));
        for line in rest {
            let mut prefix = " ".repeat(INITIAL_INDENT.len());
            let mut text = *line;
            if let Some(bullet) = BULLET.find(line) {
                prefix.push_str(bullet.as_str());
                text = &line[bullet.end()..];
            }
            self.changes.extend(wrap(text, &prefix));
        }
        self.changes.push(String::new());
    }

    fn render_into(&self, out: &mut Vec<String>) {
        match &self.header_raw {
            Some((parsed, raw)) if *parsed == self.header => out.push(raw.clone()),
            _ => out.push(self.header.render()),
        }
        out.extend(self.changes.iter().cloned());
        if let Some(trailer) = &self.trailer {
            match &self.trailer_raw {
                Some((parsed, raw)) if parsed == trailer => out.push(raw.clone()),
                _ => out.push(trailer.render()),
            }
        }
        out.extend(self.after.iter().cloned());
    }
}

/// Split text into words, keeping `Closes: #n` and `LP: #n` together
fn words(text: &str) -> Vec<String> {
    let chunks: Vec<&str> = text.split_whitespace().collect();
    let mut words = Vec::with_capacity(chunks.len());
    let mut i = 0;
    while i < chunks.len() {
        if (chunks[i].ends_with("Closes:") || chunks[i].ends_with("LP:"))
            && chunks.get(i + 1).is_some_and(|next| next.starts_with('#'))
        {
            words.push(format!("{} {}", chunks[i], chunks[i + 1]));
            i += 2;
        } else {
            words.push(chunks[i].to_string());
            i += 1;
        }
    }
    words
}

/// Greedy wrap; words longer than the width are never broken
fn wrap(text: &str, initial_indent: &str) -> Vec<String> {
    let subsequent = " ".repeat(initial_indent.chars().count());
    let mut lines = Vec::new();
    let mut current = initial_indent.to_string();
    let mut has_words = false;
    for word in words(text) {
        if has_words && current.chars().count() + 1 + word.chars().count() > WIDTH {
            lines.push(std::mem::replace(&mut current, subsequent.clone()));
            has_words = false;
        }
        if has_words {
            current.push(' ');
        }
        current.push_str(&word);
        has_words = true;
    }
    if has_words {
        lines.push(current);
    }
    lines
}

/// Fields of a block created with [`Changelog::new_block`]
#[derive(Debug, Clone)]
pub struct NewBlock {
    pub package: String,
    pub version: Version,
    pub distributions: String,
    pub urgency: String,
    pub maintainer: (String, String),
    pub timestamp: DateTime<FixedOffset>,
    /// Change lines without the surrounding blank lines
    pub changes: Vec<String>,
}

/// A parsed changelog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changelog {
    leading: Vec<String>,
    blocks: Vec<ChangeBlock>,
    eol: LineEnding,
    final_newline: bool,
}

impl Default for Changelog {
    fn default() -> Self {
        Self {
            leading: Vec::new(),
            blocks: Vec::new(),
            eol: LineEnding::Lf,
            final_newline: true,
        }
    }
}

impl Changelog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let (lines, eol, final_newline) = split_lines(text);
        let mut changelog = Self {
            eol,
            final_newline,
            ..Self::default()
        };

        for (index, line) in lines.into_iter().enumerate() {
            if let Some(header) = Header::parse(&line) {
                changelog.blocks.push(ChangeBlock {
                    header_raw: Some((header.clone(), line)),
                    header,
                    changes: Vec::new(),
                    trailer: None,
                    trailer_raw: None,
                    after: Vec::new(),
                });
                continue;
            }
            let Some(block) = changelog.blocks.last_mut() else {
                if line.trim().is_empty() || line.starts_with('#') {
                    changelog.leading.push(line);
                    continue;
                }
                return Err(Error::parse(index + 1, "expected a changelog header"));
            };
            if block.trailer.is_some() {
                block.after.push(line);
            } else if let Some(trailer) = Trailer::parse(&line) {
                block.trailer_raw = Some((trailer.clone(), line));
                block.trailer = Some(trailer);
            } else {
                block.changes.push(line);
            }
        }
        Ok(changelog)
    }

    pub fn render(&self) -> String {
        let mut lines = self.leading.clone();
        for block in &self.blocks {
            block.render_into(&mut lines);
        }
        join_lines(&lines, self.eol, self.final_newline)
    }

    pub fn blocks(&self) -> &[ChangeBlock] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [ChangeBlock] {
        &mut self.blocks
    }

    /// The newest block
    pub fn top(&self) -> Option<&ChangeBlock> {
        self.blocks.first()
    }

    pub fn top_mut(&mut self) -> Option<&mut ChangeBlock> {
        self.blocks.first_mut()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Versions of all blocks, newest first
    pub fn versions(&self) -> Result<Vec<Version>> {
        self.blocks.iter().map(ChangeBlock::version).collect()
    }

    /// Add a block at the top of the changelog.
    pub fn new_block(&mut self, block: NewBlock) {
        let header = Header {
            package: block.package,
            version: block.version.to_string(),
            distributions: block.distributions.split_whitespace().map(str::to_string).collect(),
            metadata: format!("urgency={}", block.urgency),
        };
        let mut changes = vec![String::new()];
        changes.extend(block.changes);
        changes.push(String::new());
        let after = if self.blocks.is_empty() {
            Vec::new()
        } else {
            vec![String::new()]
        };
        self.blocks.insert(
            0,
            ChangeBlock {
                header,
                header_raw: None,
                changes,
                trailer: Some(Trailer {
                    maintainer: block.maintainer.0,
                    email: block.maintainer.1,
                    date: block.timestamp.format(DATE_FORMAT).to_string(),
                }),
                trailer_raw: None,
                after,
            },
        );
        self.final_newline = true;
    }

    /// Record a change, in the top block when it is unreleased or in a new
    /// UNRELEASED block otherwise.
    pub fn add_entry(
        &mut self,
        summary: &[&str],
        maintainer: (&str, &str),
        timestamp: DateTime<FixedOffset>,
    ) -> Result<()> {
        let Some(top) = self.blocks.first() else {
            return Err(Error::Unsupported {
                path: "debian/changelog".into(),
                reason: "changelog has no entries".to_string(),
            });
        };
        if !top.is_unreleased() {
            let block = NewBlock {
                package: top.package().to_string(),
                version: increment_version(&top.version()?)?,
                distributions: "UNRELEASED".to_string(),
                urgency: "medium".to_string(),
                maintainer: (maintainer.0.to_string(), maintainer.1.to_string()),
                timestamp,
                changes: Vec::new(),
            };
            tracing::debug!(version = %block.version, "opening new changelog block");
            self.new_block(block);
        }
        if let Some(top) = self.blocks.first_mut() {
            top.add_change(summary);
        }
        Ok(())
    }

    pub fn normalize(&self) -> serde_json::Value {
        let blocks: Vec<_> = self
            .blocks
            .iter()
            .map(|b| {
                let changes: Vec<&str> = b
                    .changes
                    .iter()
                    .map(|l| l.trim_end())
                    .filter(|l| !l.is_empty())
                    .collect();
                serde_json::json!({
                    "header": &b.header,
                    "changes": changes,
                    "trailer": &b.trailer,
                })
            })
            .collect();
        serde_json::Value::Array(blocks)
    }
}

/// Whether a distribution name marks an unreleased entry
pub fn distribution_is_unreleased(distribution: &str) -> bool {
    distribution == "UNRELEASED" || distribution.starts_with("UNRELEASED-")
}

/// Distribution of the newest released block
pub fn find_last_distribution(changelog: &Changelog) -> Option<&str> {
    changelog
        .blocks
        .iter()
        .filter_map(|b| b.distributions().first())
        .map(String::as_str)
        .find(|d| !distribution_is_unreleased(d))
}

/// Next version after `version`: the Debian revision (or, for native
/// packages, the upstream version) has its trailing number incremented.
pub fn increment_version(version: &Version) -> Result<Version> {
    fn bump(part: &str) -> String {
        match TRAILING_NUMBER.captures(part) {
            Some(caps) => {
                let number = &caps["number"];
                let next = number
                    .parse::<u64>()
                    .map(|n| (n + 1).to_string())
                    .unwrap_or_else(|_| format!("{number}1"));
                format!("{}{next}", &caps["prefix"])
            }
            None => format!("{part}1"),
        }
    }

    let mut text = String::new();
    if let Some(epoch) = version.epoch {
        text.push_str(&format!("{epoch}:"));
    }
    match version.debian_revision.as_deref() {
        Some(revision) => {
            text.push_str(&version.upstream_version);
            text.push('-');
            text.push_str(&bump(revision));
        }
        None => text.push_str(&bump(&version.upstream_version)),
    }
    parse_version(&text)
}

/// Handler for `debian/changelog`
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangelogHandler;

impl ChangelogHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FormatHandler for ChangelogHandler {
    type Document = Changelog;

    fn format(&self) -> Format {
        Format::Changelog
    }

    fn parse(&self, source: &str) -> Result<Changelog> {
        Changelog::parse(source)
    }

    fn empty(&self) -> Changelog {
        Changelog::new()
    }

    fn render(&self, doc: &Changelog) -> String {
        doc.render()
    }

    fn normalize(&self, doc: &Changelog) -> serde_json::Value {
        doc.normalize()
    }
}
