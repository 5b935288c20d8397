//! Package relation fields (`Depends`, `Build-Depends`, ...)
//!
//! A relation field is a comma separated list of entries; each entry is a
//! list of alternatives separated by `|`. Entries keep the whitespace around
//! them and their original text, so rewriting a list only changes the
//! entries that were touched.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use debian_control::lossless::Relation as SyntaxRelation;
use debian_control::relations::VersionConstraint;

use crate::error::{Error, Result};
use crate::version::Version;

/// Version operator of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    StrictlyLess,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    StrictlyGreater,
}

impl Constraint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrictlyLess => "<<",
            Self::LessOrEqual => "<=",
            Self::Equal => "=",
            Self::GreaterOrEqual => ">=",
            Self::StrictlyGreater => ">>",
        }
    }
}

impl From<VersionConstraint> for Constraint {
    fn from(constraint: VersionConstraint) -> Self {
        match constraint {
            VersionConstraint::LessThan => Self::StrictlyLess,
            VersionConstraint::LessThanEqual => Self::LessOrEqual,
            VersionConstraint::Equal => Self::Equal,
            VersionConstraint::GreaterThanEqual => Self::GreaterOrEqual,
            VersionConstraint::GreaterThan => Self::StrictlyGreater,
        }
    }
}

impl From<Constraint> for VersionConstraint {
    fn from(constraint: Constraint) -> Self {
        match constraint {
            Constraint::StrictlyLess => Self::LessThan,
            Constraint::LessOrEqual => Self::LessThanEqual,
            Constraint::Equal => Self::Equal,
            Constraint::GreaterOrEqual => Self::GreaterThanEqual,
            Constraint::StrictlyGreater => Self::GreaterThan,
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substitution variables and template tokens stand in for relations
fn is_placeholder(text: &str) -> bool {
    (text.starts_with("${") && text.ends_with('}'))
        || (text.len() > 2 && text.starts_with('@') && text.ends_with('@'))
}

fn invalid(text: &str, message: impl Display) -> Error {
    Error::InvalidRelation {
        text: text.to_string(),
        message: message.to_string(),
    }
}

/// A single package requirement, e.g. `foo:any (>= 1.0) [amd64] <!nocheck>`.
///
/// The text is parsed by the lossless relation grammar of `debian-control`
/// and kept verbatim; only a version change rewrites it.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    text: String,
    name: String,
    archqual: Option<String>,
    version: Option<(Constraint, Version)>,
}

impl Relation {
    /// A relation on `name` without further restrictions
    pub fn simple(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            text: name.clone(),
            name,
            archqual: None,
            version: None,
        }
    }

    pub fn versioned(name: impl Into<String>, constraint: Constraint, version: Version) -> Self {
        let name = name.into();
        Self {
            text: format!("{name} ({constraint} {version})"),
            name,
            archqual: None,
            version: Some((constraint, version)),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if is_placeholder(trimmed) {
            return Ok(Self::simple(trimmed));
        }
        let syntax: SyntaxRelation = trimmed.parse().map_err(|e| invalid(text, e))?;
        Ok(Self {
            text: syntax.to_string(),
            name: syntax.name(),
            archqual: syntax.archqual(),
            version: syntax.version().map(|(c, v)| (c.into(), v)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn archqual(&self) -> Option<&str> {
        self.archqual.as_deref()
    }

    pub fn version(&self) -> Option<&(Constraint, Version)> {
        self.version.as_ref()
    }

    /// Replace the version constraint, keeping qualifiers and restrictions.
    pub fn set_version(&mut self, constraint: Constraint, version: Version) -> Result<()> {
        if is_placeholder(&self.text) {
            return Err(invalid(&self.text, "cannot version a placeholder"));
        }
        let mut syntax: SyntaxRelation = self.text.parse().map_err(|e| invalid(&self.text, e))?;
        syntax.set_version(Some((constraint.into(), version.clone())));
        self.text = syntax.to_string();
        self.version = Some((constraint, version));
        Ok(())
    }
}

impl FromStr for Relation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Parse a `|` separated list of alternatives
pub fn parse_alternatives(text: &str) -> Result<Vec<Relation>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split('|').map(Relation::parse).collect()
}

fn format_alternatives(alternatives: &[Relation]) -> String {
    alternatives
        .iter()
        .map(Relation::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// One comma separated entry with the whitespace around it
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub head: String,
    pub alternatives: Vec<Relation>,
    pub tail: String,
    original: Option<(Vec<Relation>, String)>,
}

impl Entry {
    pub fn new(head: impl Into<String>, alternatives: Vec<Relation>, tail: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            alternatives,
            tail: tail.into(),
            original: None,
        }
    }

    /// Entry holding only whitespace, such as the tail after a trailing comma
    pub fn is_formatting(&self) -> bool {
        self.alternatives.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.alternatives.iter().map(Relation::name)
    }

    fn body(&self) -> String {
        match &self.original {
            Some((alternatives, text)) if *alternatives == self.alternatives => text.clone(),
            _ => format_alternatives(&self.alternatives),
        }
    }
}

/// A parsed relation field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relations {
    entries: Vec<Entry>,
}

impl Relations {
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::default());
        }
        let mut entries = Vec::new();
        for segment in text.split(',') {
            if segment.trim().is_empty() {
                entries.push(Entry::new(segment, Vec::new(), ""));
                continue;
            }
            let body = segment.trim_start();
            let head = &segment[..segment.len() - body.len()];
            let trimmed = body.trim_end();
            let tail = &body[trimmed.len()..];
            let alternatives = parse_alternatives(trimmed)?;
            entries.push(Entry {
                head: head.to_string(),
                original: Some((alternatives.clone(), trimmed.to_string())),
                alternatives,
                tail: tail.to_string(),
            });
        }
        Ok(Self { entries })
    }

    /// Render the list; continuation lines that end up empty are dropped.
    pub fn render(&self) -> String {
        let joined = self
            .entries
            .iter()
            .map(|e| format!("{}{}{}", e.head, e.body(), e.tail))
            .collect::<Vec<_>>()
            .join(",");
        joined
            .split('\n')
            .enumerate()
            .filter(|(i, line)| *i == 0 || !line.trim().is_empty())
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    /// Whether no entry names a package
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Entry::is_formatting)
    }

    /// Entries mentioning `package` in any alternative, with their index
    pub fn iter_relations<'a>(&'a self, package: &'a str) -> impl Iterator<Item = (usize, &'a Entry)> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.names().any(|n| n == package))
    }

    /// The entry that is exactly a relation on `package`.
    ///
    /// An entry offering `package` as one of several alternatives is an error.
    pub fn get_relation<'a>(&'a self, package: &'a str) -> Result<Option<(usize, &'a Entry)>> {
        match self.iter_relations(package).next() {
            Some((_, entry)) if entry.alternatives.len() > 1 => Err(complex_rule(entry, package)),
            found => Ok(found),
        }
    }

    /// Insert an entry, guessing separators from the existing entries.
    ///
    /// `position` defaults to the end of the list.
    pub fn add(&mut self, alternatives: Vec<Relation>, position: Option<usize>) -> Result<()> {
        let pointless_tail = match self.entries.last() {
            Some(last) if last.is_formatting() => self.entries.pop(),
            _ => None,
        };

        let len = self.entries.len();
        let (head, tail) = match len {
            0 => (String::new(), String::new()),
            1 => {
                let head = match self.entries[0].head.as_str() {
                    "" => " ".to_string(),
                    h => h.to_string(),
                };
                (head, String::new())
            }
            _ => {
                let heads: HashSet<&str> = self.entries[1..].iter().map(|e| e.head.as_str()).collect();
                let head = match heads.len() {
                    1 => heads.into_iter().next().unwrap_or_default().to_string(),
                    _ => self.entries[len - 1].head.clone(),
                };
                let tails: HashSet<&str> =
                    self.entries[..len - 1].iter().map(|e| e.tail.as_str()).collect();
                let tail = match tails.len() {
                    1 => tails.into_iter().next().unwrap_or_default().to_string(),
                    _ => self.entries[0].tail.clone(),
                };
                (head, tail)
            }
        };

        let position = position.unwrap_or(len);
        if position > len {
            if let Some(tail) = pointless_tail {
                self.entries.push(tail);
            }
            return Err(invalid(
                &format_alternatives(&alternatives),
                format!("position {position} out of bounds"),
            ));
        }

        if position == len {
            let last_tail = match self.entries.last_mut() {
                Some(last) => std::mem::replace(&mut last.tail, tail),
                None => String::new(),
            };
            self.entries.push(Entry::new(head, alternatives, last_tail));
        } else if position == 0 {
            let first_head = self.entries[0].head.clone();
            self.entries.insert(0, Entry::new(first_head, alternatives, tail));
            self.entries[1].head = head;
        } else {
            self.entries.insert(position, Entry::new(head, alternatives, tail));
        }

        if let Some(tail) = pointless_tail {
            self.entries.push(tail);
        }
        Ok(())
    }

    /// Drop entries for which `keep` returns false.
    ///
    /// When the first entry goes, its separators move to the next one.
    pub fn retain(&mut self, mut keep: impl FnMut(&Entry) -> bool) {
        let mut kept = Vec::with_capacity(self.entries.len());
        let mut entries = std::mem::take(&mut self.entries).into_iter().enumerate().peekable();
        let mut carry: Option<(String, String)> = None;
        while let Some((index, mut entry)) = entries.next() {
            if let Some((head, tail)) = carry.take() {
                entry.head = head;
                entry.tail = tail;
            }
            if entry.is_formatting() || keep(&entry) {
                kept.push(entry);
            } else if index == 0 && entries.peek().is_some() {
                carry = Some((entry.head, entry.tail));
            }
        }
        self.entries = kept;
    }
}

impl FromStr for Relations {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for Relations {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

fn complex_rule(entry: &Entry, package: &str) -> Error {
    invalid(&entry.body(), format!("complex rule for {package}"))
}

/// Whether `dep` is satisfied whenever `outer` is
pub fn is_dep_implied(dep: &Relation, outer: &Relation) -> bool {
    use Constraint::*;

    if dep.name != outer.name {
        return false;
    }
    let Some((dep_op, dep_version)) = &dep.version else {
        return true;
    };
    let Some((outer_op, outer_version)) = &outer.version else {
        return false;
    };
    if dep_op == outer_op && dep_version == outer_version {
        return true;
    }

    match (dep_op, outer_op) {
        (GreaterOrEqual, StrictlyGreater) => outer_version > dep_version,
        (GreaterOrEqual, GreaterOrEqual | Equal) => outer_version >= dep_version,
        (GreaterOrEqual, StrictlyLess | LessOrEqual) => false,
        (Equal, Equal) => outer_version == dep_version,
        (Equal, _) => false,
        (StrictlyLess, StrictlyLess) => outer_version <= dep_version,
        (StrictlyLess, LessOrEqual | Equal) => outer_version < dep_version,
        (StrictlyLess, StrictlyGreater | GreaterOrEqual) => false,
        (LessOrEqual, LessOrEqual | Equal | StrictlyLess) => outer_version <= dep_version,
        (LessOrEqual, StrictlyGreater | GreaterOrEqual) => false,
        (StrictlyGreater, StrictlyGreater) => outer_version >= dep_version,
        (StrictlyGreater, Equal | GreaterOrEqual) => outer_version > dep_version,
        (StrictlyGreater, StrictlyLess | LessOrEqual) => false,
    }
}

/// Whether the alternatives `inner` are satisfied whenever `outer` is
pub fn is_relation_implied(inner: &[Relation], outer: &[Relation]) -> bool {
    inner == outer
        || inner
            .iter()
            .any(|inner_dep| outer.iter().any(|outer_dep| is_dep_implied(inner_dep, outer_dep)))
}

/// Remove every entry that only names `package`.
///
/// The text is returned unchanged when nothing was removed.
pub fn drop_dependency(text: &str, package: &str) -> Result<String> {
    let mut relations = Relations::parse(text)?;
    let before = relations.entries.len();
    relations.retain(|entry| !entry.names().all(|n| n == package));
    if relations.entries.len() == before {
        return Ok(text.to_string());
    }
    Ok(relations.render())
}

/// Add an entry such as `foo (>= 1.0) | bar` at `position` (default: last).
pub fn add_dependency(text: &str, relation: &str, position: Option<usize>) -> Result<String> {
    let mut relations = Relations::parse(text)?;
    relations.add(parse_alternatives(relation)?, position)?;
    Ok(relations.render())
}

fn single_package_entries<'a>(
    relations: &'a mut Relations,
    package: &str,
) -> Result<Vec<&'a mut Entry>> {
    let mut found = Vec::new();
    for entry in relations.entries.iter_mut() {
        let names: Vec<&str> = entry.names().collect();
        if names.len() > 1 && names[0] == package {
            return Err(complex_rule(entry, package));
        }
        if names == [package] {
            found.push(entry);
        }
    }
    Ok(found)
}

/// Add an unversioned relation on `package` unless one already exists.
pub fn ensure_some_version(text: &str, package: &str) -> Result<String> {
    let mut relations = Relations::parse(text)?;
    if !single_package_entries(&mut relations, package)?.is_empty() {
        return Ok(text.to_string());
    }
    relations.add(vec![Relation::simple(package)], None)?;
    Ok(relations.render())
}

/// Require at least `minimum` of `package`.
///
/// Existing lower bounds are raised, a missing relation is added, and
/// alternatives whose bound on `package` is now redundant are dropped.
pub fn ensure_minimum_version(text: &str, package: &str, minimum: &Version) -> Result<String> {
    let mut relations = Relations::parse(text)?;
    let mut found = false;
    let mut changed = false;
    let mut obsolete = Vec::new();

    for (index, entry) in relations.entries.iter_mut().enumerate() {
        let names: Vec<&str> = entry.names().collect();
        if names.len() > 1 && names.contains(&package) {
            let is_obsolete = entry
                .alternatives
                .iter()
                .filter(|r| r.name == package)
                .any(|r| match &r.version {
                    Some((Constraint::StrictlyGreater, v)) => v < minimum,
                    Some((Constraint::GreaterOrEqual, v)) => v <= minimum,
                    _ => false,
                });
            if is_obsolete {
                obsolete.push(index);
            }
        }
        if names != [package] {
            continue;
        }
        found = true;
        let outdated = match &entry.alternatives[0].version {
            None => true,
            Some((_, v)) => v < minimum,
        };
        if outdated {
            entry.alternatives[0].set_version(Constraint::GreaterOrEqual, minimum.clone())?;
            changed = true;
        }
    }

    if !found {
        changed = true;
        relations.add(
            vec![Relation::versioned(package, Constraint::GreaterOrEqual, minimum.clone())],
            None,
        )?;
    }
    for index in obsolete.into_iter().rev() {
        relations.entries.remove(index);
    }
    if changed {
        Ok(relations.render())
    } else {
        Ok(text.to_string())
    }
}

/// Require exactly `version` of `package`.
pub fn ensure_exact_version(
    text: &str,
    package: &str,
    version: &Version,
    position: Option<usize>,
) -> Result<String> {
    let mut relations = Relations::parse(text)?;
    let mut changed = false;
    let entries = single_package_entries(&mut relations, package)?;
    let found = !entries.is_empty();
    for entry in entries {
        let exact = matches!(
            &entry.alternatives[0].version,
            Some((Constraint::Equal, v)) if v == version
        );
        if !exact {
            entry.alternatives[0].set_version(Constraint::Equal, version.clone())?;
            changed = true;
        }
    }
    if !found {
        changed = true;
        relations.add(
            vec![Relation::versioned(package, Constraint::Equal, version.clone())],
            position,
        )?;
    }
    if changed {
        Ok(relations.render())
    } else {
        Ok(text.to_string())
    }
}

/// Make sure `relation` is satisfied by the list.
///
/// An existing entry that implies it leaves the text untouched; entries
/// implied by it are replaced by it.
pub fn ensure_relation(text: &str, relation: &str, position: Option<usize>) -> Result<String> {
    let new = parse_alternatives(relation)?;
    let mut relations = Relations::parse(text)?;
    let mut added = false;
    let mut to_remove = Vec::new();

    for index in 0..relations.entries.len() {
        let entry = &relations.entries[index];
        if entry.is_formatting() {
            continue;
        }
        if is_relation_implied(&new, &entry.alternatives) {
            return Ok(text.to_string());
        }
        if is_relation_implied(&entry.alternatives, &new) {
            if added {
                to_remove.push(index);
            } else {
                relations.entries[index].alternatives = new.clone();
                added = true;
            }
        }
    }
    if !added {
        relations.add(new, position)?;
    }
    for index in to_remove.into_iter().rev() {
        relations.entries.remove(index);
    }
    Ok(relations.render())
}
