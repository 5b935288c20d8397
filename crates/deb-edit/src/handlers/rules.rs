//! `debian/rules` and other Makefiles
//!
//! A Makefile is kept as a list of global lines and rules. A rule owns its
//! header line, its recipe and the comments directly above it; anything the
//! model does not understand stays a verbatim line.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Value, json};

use crate::editor::{Editor, EditorOptions};
use crate::error::Result;
use crate::format::{Format, FormatHandler};

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:export\s)?([A-Za-z0-9_]+)\s*[:?]?=\s*(.*)$").unwrap());
static WITH_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([ \t])--with([ =])([^ \t]+)").unwrap());

/// Whether `text` matches a make pattern where `%` stands for any text
pub fn matches_wildcard(text: &str, wildcard: &str) -> bool {
    let parts: Vec<&str> = wildcard.split('%').collect();
    let [first, middle @ .., last] = parts.as_slice() else {
        return text == wildcard;
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    for part in middle {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

/// A make rule: header line, recipe lines and the comments above it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    precomment: Vec<String>,
    /// Header followed by recipe lines; empty once the rule is cleared
    lines: Vec<String>,
}

impl Rule {
    /// A rule building `targets` from `components`, without a recipe
    pub fn new(targets: &[&str], components: &[&str]) -> Self {
        let mut header = format!("{}:", targets.join(" "));
        if !components.is_empty() {
            header.push(' ');
            header.push_str(&components.join(" "));
        }
        Self::from_header(header, Vec::new())
    }

    fn from_header(header: String, precomment: Vec<String>) -> Self {
        Self {
            precomment,
            lines: vec![header],
        }
    }

    pub fn with_precomment(mut self, lines: &[&str]) -> Self {
        self.precomment = lines.iter().map(|line| line.to_string()).collect();
        self
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.append_command(command);
        self
    }

    /// Target text before the colon, e.g. `override_dh_auto_test`
    pub fn target(&self) -> Option<&str> {
        self.lines
            .first()
            .and_then(|header| header.split_once(':'))
            .map(|(target, _)| target)
    }

    pub fn targets(&self) -> Vec<&str> {
        self.target().map(|t| t.split(' ').collect()).unwrap_or_default()
    }

    pub fn has_target(&self, target: &str, exact: bool) -> bool {
        self.targets().iter().any(|t| match exact {
            true => *t == target,
            false => matches_wildcard(target, t),
        })
    }

    /// Prerequisites listed after the colon
    pub fn components(&self) -> Vec<&str> {
        self.lines
            .first()
            .and_then(|header| header.split_once(':'))
            .map(|(_, rest)| rest.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn precomment(&self) -> &[String] {
        &self.precomment
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Recipe commands without their leading tab
    pub fn commands(&self) -> Vec<&str> {
        self.lines
            .iter()
            .skip(1)
            .filter_map(|line| line.strip_prefix('\t'))
            .collect()
    }

    pub fn append_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn append_command(&mut self, command: &str) {
        self.lines.push(format!("\t{command}"));
    }

    fn set_components(&mut self, components: &[String]) {
        let Some(target) = self.target().map(str::to_string) else {
            return;
        };
        let mut header = format!("{target}:");
        if !components.is_empty() {
            header.push(' ');
            header.push_str(&components.join(" "));
        }
        self.lines[0] = header;
    }

    pub fn append_component(&mut self, component: &str) {
        let mut components: Vec<String> = self.components().into_iter().map(str::to_string).collect();
        components.push(component.to_string());
        self.set_components(&components);
    }

    pub fn remove_component(&mut self, component: &str) {
        let components: Vec<String> = self
            .components()
            .into_iter()
            .filter(|c| *c != component)
            .map(str::to_string)
            .collect();
        self.set_components(&components);
    }

    /// Rename the target when the whole target text equals `old`.
    pub fn rename_target(&mut self, old: &str, new: &str) -> bool {
        let Some(header) = self.lines.first_mut() else {
            return false;
        };
        match header.split_once(':') {
            Some((target, rest)) if target == old => {
                *header = format!("{new}:{rest}");
                true
            }
            _ => false,
        }
    }

    /// Drop the rule with its comments; cleared rules are not rendered.
    pub fn clear(&mut self) {
        self.precomment.clear();
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Split off trailing blank and comment lines, which belong to whatever
    /// follows the rule.
    fn finish(mut self) -> Vec<MakefileEntry> {
        let mut trailing = Vec::new();
        while self.lines.len() > 1
            && self
                .lines
                .last()
                .is_some_and(|line| line.is_empty() || line.starts_with('#'))
        {
            trailing.extend(self.lines.pop().map(MakefileEntry::Line));
        }
        trailing.reverse();
        let mut entries = vec![MakefileEntry::Rule(self)];
        entries.extend(trailing);
        entries
    }
}

/// One top-level item of a Makefile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MakefileEntry {
    Line(String),
    Rule(Rule),
}

fn is_conditional(line: &str) -> bool {
    let line = line.trim_start_matches(' ');
    ["ifeq", "ifneq", "else", "endif", "include", "-include"]
        .iter()
        .any(|keyword| line.starts_with(keyword))
}

fn is_rule(line: &str) -> bool {
    match line.split_once(':') {
        Some((before, after)) => !before.contains('=') && !after.starts_with('='),
        None => false,
    }
}

/// A parsed Makefile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Makefile {
    pub contents: Vec<MakefileEntry>,
}

impl Makefile {
    pub fn parse(text: &str) -> Self {
        let mut joined = Vec::new();
        let mut keep = String::new();
        for line in text.lines() {
            let line = std::mem::take(&mut keep) + line;
            if line.ends_with('\\') {
                keep = line + "\n";
                continue;
            }
            joined.push(line);
        }
        if !keep.is_empty() {
            joined.push(keep);
        }

        let mut contents: Vec<MakefileEntry> = Vec::new();
        let mut rule: Option<Rule> = None;
        for line in joined {
            if line.starts_with('\t')
                && let Some(rule) = rule.as_mut()
            {
                rule.append_line(line);
            } else if is_conditional(&line)
                || line.trim_start_matches(' ').starts_with('#')
                || line.trim().is_empty()
            {
                match rule.as_mut() {
                    Some(rule) => rule.append_line(line),
                    None => contents.push(MakefileEntry::Line(line)),
                }
            } else if is_rule(&line) {
                if let Some(previous) = rule.take() {
                    contents.extend(previous.finish());
                }
                let mut precomment = Vec::new();
                while contents.len() > 1
                    && matches!(contents.last(), Some(MakefileEntry::Line(l)) if l.starts_with('#'))
                {
                    if let Some(MakefileEntry::Line(comment)) = contents.pop() {
                        precomment.push(comment);
                    }
                }
                precomment.reverse();
                rule = Some(Rule::from_header(line, precomment));
            } else {
                if let Some(previous) = rule.take() {
                    contents.extend(previous.finish());
                }
                contents.push(MakefileEntry::Line(line));
            }
        }
        if let Some(rule) = rule {
            contents.extend(rule.finish());
        }
        Self { contents }
    }

    pub fn render(&self) -> String {
        let mut end = self.contents.len();
        while end > 0 && matches!(&self.contents[end - 1], MakefileEntry::Line(l) if l.is_empty()) {
            end -= 1;
        }
        let mut lines: Vec<&str> = Vec::new();
        for entry in &self.contents[..end] {
            match entry {
                MakefileEntry::Rule(rule) if rule.is_empty() => {
                    if lines.last().is_some_and(|l| l.is_empty()) {
                        lines.pop();
                    }
                }
                MakefileEntry::Rule(rule) => {
                    lines.extend(rule.precomment.iter().map(String::as_str));
                    lines.extend(rule.lines.iter().map(String::as_str));
                }
                MakefileEntry::Line(line) => lines.push(line),
            }
        }
        lines.iter().map(|line| format!("{line}\n")).collect()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.contents.iter().filter_map(|entry| match entry {
            MakefileEntry::Rule(rule) => Some(rule),
            MakefileEntry::Line(_) => None,
        })
    }

    pub fn rules_mut(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.contents.iter_mut().filter_map(|entry| match entry {
            MakefileEntry::Rule(rule) => Some(rule),
            MakefileEntry::Line(_) => None,
        })
    }

    /// Rules building `target`; with `exact` unset, `%` patterns match too
    pub fn iter_rules<'a>(&'a self, target: &'a str, exact: bool) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules().filter(move |rule| rule.has_target(target, exact))
    }

    /// Value of a global variable assignment such as `export DH_VERBOSE = 1`
    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.contents.iter().find_map(|entry| match entry {
            MakefileEntry::Line(line) => VARIABLE
                .captures(line)
                .filter(|caps| caps[1].trim() == name)
                .and_then(|caps| caps.get(2))
                .map(|value| value.as_str().trim()),
            MakefileEntry::Rule(_) => None,
        })
    }

    /// Append a rule, separated from a preceding rule by a blank line.
    pub fn add_rule(&mut self, rule: Rule) {
        if matches!(self.contents.last(), Some(MakefileEntry::Rule(_))) {
            self.contents.push(MakefileEntry::Line(String::new()));
        }
        self.contents.push(MakefileEntry::Rule(rule));
    }

    fn phony_rules(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.rules_mut().filter(|rule| rule.has_target(".PHONY", true))
    }

    /// Declare `target` phony, adding a `.PHONY` rule when there is none.
    pub fn mark_phony(&mut self, target: &str) {
        if self
            .iter_rules(".PHONY", true)
            .any(|rule| rule.components().contains(&target))
        {
            return;
        }
        match self.phony_rules().last() {
            Some(rule) => rule.append_component(target),
            None => self.add_rule(Rule::new(&[".PHONY"], &[target])),
        }
    }

    /// Add `target` to the last existing `.PHONY` rule.
    pub fn add_phony(&mut self, target: &str) {
        if let Some(rule) = self.phony_rules().last() {
            rule.append_component(target);
        }
    }

    /// Remove `target` from every `.PHONY` rule, dropping rules left empty.
    pub fn drop_phony(&mut self, target: &str) {
        for rule in self.phony_rules() {
            if rule.components().contains(&target) {
                rule.remove_component(target);
            }
            if rule.components().is_empty() {
                rule.clear();
            }
        }
    }

    /// Run the callbacks of `update` over the file.
    pub fn apply(&mut self, update: &mut RulesUpdate<'_>) {
        let mut contents: Vec<MakefileEntry> = Vec::with_capacity(self.contents.len());
        for entry in std::mem::take(&mut self.contents) {
            match entry {
                MakefileEntry::Rule(mut rule) => {
                    update.rewrite_commands(&mut rule);
                    if let Some(callback) = update.rule.as_mut() {
                        callback(&mut rule);
                    }
                    if !rule.is_empty() {
                        contents.push(MakefileEntry::Rule(rule));
                    } else if matches!(contents.last(), Some(MakefileEntry::Line(l)) if l.is_empty()) {
                        contents.pop();
                    }
                }
                MakefileEntry::Line(line) => {
                    let replacement = match update.global_line.as_mut() {
                        Some(callback) => callback(&line),
                        None => Some(vec![line]),
                    };
                    match replacement {
                        Some(lines) => contents.extend(lines.into_iter().map(MakefileEntry::Line)),
                        None => drop_line_context(&mut contents, update.drop_related_comments),
                    }
                }
            }
        }
        self.contents = contents;
        if let Some(callback) = update.makefile.as_mut() {
            callback(self);
        }
    }
}

/// Remove what was only there for a dropped global line
fn drop_line_context(contents: &mut Vec<MakefileEntry>, drop_comments: bool) {
    if drop_comments {
        while matches!(contents.last(), Some(MakefileEntry::Line(l)) if l.starts_with('#') && !l.starts_with("#!")) {
            contents.pop();
        }
    }
    if matches!(contents.last(), Some(MakefileEntry::Line(l)) if l.is_empty()) {
        contents.pop();
    }
}

type CommandCallback<'a> = Box<dyn FnMut(&str, &str) -> Vec<String> + 'a>;

/// Callbacks run over a rules file by [`update_rules`]
#[derive(Default)]
pub struct RulesUpdate<'a> {
    commands: Vec<CommandCallback<'a>>,
    global_line: Option<Box<dyn FnMut(&str) -> Option<Vec<String>> + 'a>>,
    rule: Option<Box<dyn FnMut(&mut Rule) + 'a>>,
    makefile: Option<Box<dyn FnMut(&mut Makefile) + 'a>>,
    drop_related_comments: bool,
}

impl<'a> RulesUpdate<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite recipe commands. The callback gets the command and the rule
    /// target and returns the replacement commands; callbacks run in the
    /// order they were added, each on the output of the previous one.
    pub fn command_line(mut self, callback: impl FnMut(&str, &str) -> Vec<String> + 'a) -> Self {
        self.commands.push(Box::new(callback));
        self
    }

    /// Rewrite global lines; `None` drops the line.
    pub fn global_line(mut self, callback: impl FnMut(&str) -> Option<Vec<String>> + 'a) -> Self {
        self.global_line = Some(Box::new(callback));
        self
    }

    /// Inspect or change every rule; cleared rules are removed.
    pub fn rule(mut self, callback: impl FnMut(&mut Rule) + 'a) -> Self {
        self.rule = Some(Box::new(callback));
        self
    }

    /// Run once on the whole file after the other callbacks
    pub fn makefile(mut self, callback: impl FnMut(&mut Makefile) + 'a) -> Self {
        self.makefile = Some(Box::new(callback));
        self
    }

    /// Also drop the comment block above a dropped global line
    pub fn drop_related_comments(mut self, drop: bool) -> Self {
        self.drop_related_comments = drop;
        self
    }

    fn rewrite_commands(&mut self, rule: &mut Rule) {
        if self.commands.is_empty() || rule.is_empty() {
            return;
        }
        let target = rule.target().unwrap_or_default().to_string();
        let mut lines = vec![rule.lines[0].clone()];
        for line in rule.lines.drain(1..) {
            let Some(command) = line.strip_prefix('\t') else {
                lines.push(line);
                continue;
            };
            let mut commands = vec![command.to_string()];
            for callback in &mut self.commands {
                commands = commands
                    .iter()
                    .flat_map(|command| callback(command, &target))
                    .collect();
            }
            lines.extend(commands.into_iter().map(|command| format!("\t{command}")));
        }
        rule.lines = lines;
    }
}

impl std::fmt::Debug for RulesUpdate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesUpdate")
            .field("commands", &self.commands.len())
            .field("drop_related_comments", &self.drop_related_comments)
            .finish_non_exhaustive()
    }
}

/// Clear an `override_<command>` rule whose recipe only runs `<command>`.
pub fn discard_pointless_override(makefile: &mut Makefile, index: usize, ignore_comments: bool) {
    let Some(MakefileEntry::Rule(rule)) = makefile.contents.get_mut(index) else {
        return;
    };
    let Some(command) = rule.target().and_then(|t| t.strip_prefix("override_")) else {
        return;
    };
    let expected = format!("\t{command}");
    let effective: Vec<&String> = rule.lines[1..]
        .iter()
        .filter(|line| match ignore_comments {
            true => !line.split('#').next().unwrap_or_default().trim().is_empty(),
            false => !line.trim().is_empty(),
        })
        .collect();
    if effective != [&expected] || !rule.components().is_empty() {
        return;
    }
    let target = rule.target().unwrap_or_default().to_string();
    tracing::debug!(%target, "discarding pointless override");
    rule.clear();
    makefile.drop_phony(&target);
}

pub fn discard_pointless_overrides(makefile: &mut Makefile, ignore_comments: bool) {
    for index in 0..makefile.contents.len() {
        discard_pointless_override(makefile, index, ignore_comments);
    }
}

/// Handler for `debian/rules`
#[derive(Debug, Default, Clone, Copy)]
pub struct RulesHandler;

impl RulesHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FormatHandler for RulesHandler {
    type Document = Makefile;

    fn format(&self) -> Format {
        Format::Rules
    }

    fn parse(&self, source: &str) -> Result<Makefile> {
        Ok(Makefile::parse(source))
    }

    fn empty(&self) -> Makefile {
        Makefile::default()
    }

    fn render(&self, doc: &Makefile) -> String {
        doc.render()
    }

    /// Global statements and rules without comments or blank lines
    fn normalize(&self, doc: &Makefile) -> Value {
        let entries: Vec<Value> = doc
            .contents
            .iter()
            .filter_map(|entry| match entry {
                MakefileEntry::Line(line) => {
                    let line = line.trim();
                    (!line.is_empty() && !line.starts_with('#')).then(|| json!(line))
                }
                MakefileEntry::Rule(rule) if rule.is_empty() => None,
                MakefileEntry::Rule(rule) => Some(json!({
                    "targets": rule.targets(),
                    "components": rule.components(),
                    "commands": rule.commands(),
                })),
            })
            .collect();
        Value::Array(entries)
    }
}

/// Apply `update` to the rules file at `path`.
///
/// A missing file is not an error; nothing changes. Overrides made
/// pointless by the update are discarded. Returns whether the file changed.
pub fn update_rules(path: impl AsRef<Path>, options: EditorOptions, mut update: RulesUpdate<'_>) -> Result<bool> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(false);
    }
    let mut editor = Editor::open(path, RulesHandler::new(), options)?;
    editor.document_mut().apply(&mut update);
    if editor.has_changed() {
        discard_pointless_overrides(editor.document_mut(), false);
    }
    Ok(editor.commit()?.changed())
}

/// Whether the rules file at `path` includes cdbs
pub fn check_cdbs(path: impl AsRef<Path>) -> Result<bool> {
    let Some(text) = deb_fs::read_text_if_exists(path.as_ref())? else {
        return Ok(false);
    };
    Ok(text
        .lines()
        .any(|line| line.trim_start_matches('-').starts_with("include /usr/share/cdbs/")))
}

/// Add `addon` to the `--with` option of a `dh` command line.
pub fn dh_invoke_add_with(line: &str, addon: &str) -> String {
    if line.contains(addon) {
        return line.to_string();
    }
    if !line.contains(" --with") {
        return format!("{line} --with={addon}");
    }
    WITH_OPTION
        .replace_all(line, |caps: &Captures<'_>| {
            format!("{}--with{}{},{addon}", &caps[1], &caps[2], &caps[3])
        })
        .into_owned()
}

/// Addons named in the `--with` options of a `dh` command line
pub fn dh_invoke_get_with(line: &str) -> Vec<String> {
    WITH_OPTION
        .captures_iter(line)
        .flat_map(|caps| {
            caps[3]
                .split(',')
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Remove `addon` from the `--with` options, dropping options left empty.
pub fn dh_invoke_drop_with(line: &str, addon: &str) -> String {
    if !line.contains(addon) {
        return line.to_string();
    }
    WITH_OPTION
        .replace_all(line, |caps: &Captures<'_>| {
            let kept: Vec<&str> = caps[3].split(',').filter(|a| *a != addon).collect();
            match kept.is_empty() {
                true => String::new(),
                false => format!("{}--with{}{}", &caps[1], &caps[2], kept.join(",")),
            }
        })
        .into_owned()
}

/// Split a command line into words, each with the blanks in front of it
fn words(line: &str) -> Vec<(&str, &str)> {
    let mut words = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        let start = rest.find(|c: char| c != ' ' && c != '\t').unwrap_or(rest.len());
        let (blank, tail) = rest.split_at(start);
        let end = tail.find([' ', '\t']).unwrap_or(tail.len());
        let (word, next) = tail.split_at(end);
        words.push((blank, word));
        rest = next;
    }
    words
}

/// Remove a standalone `argument` from a `dh` command line.
pub fn dh_invoke_drop_argument(line: &str, argument: &str) -> String {
    if !line.contains(argument) {
        return line.to_string();
    }
    let words = words(line);
    let mut out = String::with_capacity(line.len());
    let mut skip_blank = false;
    for (index, (blank, word)) in words.iter().enumerate() {
        if *word == argument && !blank.is_empty() {
            if index + 1 < words.len() {
                out.push_str(blank);
                skip_blank = true;
            }
            continue;
        }
        if !std::mem::take(&mut skip_blank) {
            out.push_str(blank);
        }
        out.push_str(word);
    }
    out
}

/// Replace a standalone `old` argument of a `dh` command line with `new`.
pub fn dh_invoke_replace_argument(line: &str, old: &str, new: &str) -> String {
    if !line.contains(old) {
        return line.to_string();
    }
    words(line)
        .into_iter()
        .map(|(blank, word)| match word == old && !blank.is_empty() {
            true => format!("{blank}{new}"),
            false => format!("{blank}{word}"),
        })
        .collect()
}
