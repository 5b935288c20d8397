//! Provenance of generated packaging files
//!
//! A file such as `debian/control` may be the output of a template
//! (`debian/control.in`, `debian/control.m4`) or of another tool. Edits to
//! such a file are lost on the next regeneration, so they have to be
//! redirected to the template and the file regenerated.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::deb822::{Conflict, Document, has_do_not_edit_marker};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::relations::{Relations, ensure_relation, is_relation_implied};

/// Suffixes of template files, in the order they are looked up
pub const TEMPLATE_SUFFIXES: [&str; 2] = [".in", ".m4"];

/// How a template is turned into its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    /// `debian/rules` has a rule producing `debian/control`
    Rules,
    /// GNOME team template, expanded by `dh_gnome_clean`
    Gnome,
    /// PostgreSQL extension template, expanded by `pg_buildext updatecontrol`
    Postgresql,
    /// cdbs template; edits are applied to template and target alike
    Cdbs,
    /// The template path is a directory
    Directory,
    /// Control generated by debcargo from `debian/debcargo.toml`
    Debcargo,
    /// Template of a type that cannot be expanded
    Unknown,
    /// Configured shell command
    Command(String),
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rules => f.write_str("rules"),
            Self::Gnome => f.write_str("gnome"),
            Self::Postgresql => f.write_str("postgresql"),
            Self::Cdbs => f.write_str("cdbs"),
            Self::Directory => f.write_str("directory"),
            Self::Debcargo => f.write_str("debcargo"),
            Self::Unknown => f.write_str("unknown"),
            Self::Command(command) => write!(f, "command `{command}`"),
        }
    }
}

/// A generated file and the template it comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedLink {
    pub target: PathBuf,
    pub template: PathBuf,
    pub kind: TemplateKind,
}

impl GeneratedLink {
    /// Whether the template can be edited and expanded again
    pub fn is_expandable(&self) -> bool {
        !matches!(
            self.kind,
            TemplateKind::Directory | TemplateKind::Debcargo | TemplateKind::Unknown
        )
    }

    fn refuse(&self, reason: impl Into<String>) -> Error {
        Error::generated(&self.target, Some(self.template.clone()), reason)
    }
}

/// Where the content of a file comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Provenance {
    /// Maintained by hand
    Plain,
    /// Generated from a template
    Template(GeneratedLink),
    /// Carries a `DO NOT EDIT` marker but has no known template
    MarkedGenerated,
}

impl Provenance {
    pub fn is_generated(&self) -> bool {
        !matches!(self, Self::Plain)
    }

    pub fn link(&self) -> Option<&GeneratedLink> {
        match self {
            Self::Template(link) => Some(link),
            _ => None,
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn debian_dir(target: &Path) -> &Path {
    target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Directory generators run in: the parent of the `debian/` directory
pub fn package_root(target: &Path) -> PathBuf {
    target
        .parent()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf()
}

/// Template files that exist next to `target`
pub fn find_templates(target: &Path) -> Vec<PathBuf> {
    TEMPLATE_SUFFIXES
        .iter()
        .map(|suffix| with_suffix(target, suffix))
        .filter(|p| p.exists())
        .collect()
}

/// Determine the provenance of `target`.
///
/// Ambiguous provenance (several templates, or a control template next to
/// `debcargo.toml`) is a [`Error::ChangeConflict`]. A configured
/// `regenerate_command` overrides template type detection.
pub fn resolve(target: &Path, format: Format, regenerate_command: Option<&str>) -> Result<Provenance> {
    let templates = find_templates(target);
    let debcargo = Some(debian_dir(target).join("debcargo.toml"))
        .filter(|p| format == Format::Control && p.is_file());

    let provenance = match (templates.as_slice(), debcargo) {
        ([first, second, ..], _) => {
            return Err(Error::conflict(
                target,
                format!(
                    "ambiguous templates {} and {}",
                    first.display(),
                    second.display()
                ),
            ));
        }
        ([template], Some(debcargo)) => {
            return Err(Error::conflict(
                target,
                format!(
                    "generated from both {} and {}",
                    template.display(),
                    debcargo.display()
                ),
            ));
        }
        ([], Some(debcargo)) => Provenance::Template(GeneratedLink {
            target: target.to_path_buf(),
            template: debcargo,
            kind: TemplateKind::Debcargo,
        }),
        ([template], None) => {
            let kind = match regenerate_command {
                Some(command) => TemplateKind::Command(command.to_string()),
                None if format == Format::Control => {
                    guess_template_type(template, Some(debian_dir(target)))?
                }
                None => TemplateKind::Unknown,
            };
            Provenance::Template(GeneratedLink {
                target: target.to_path_buf(),
                template: template.clone(),
                kind,
            })
        }
        ([], None) => match deb_fs::read_text_if_exists(target)? {
            Some(text) if has_do_not_edit_marker(&text) => Provenance::MarkedGenerated,
            _ => Provenance::Plain,
        },
    };
    tracing::debug!(path = %target.display(), ?provenance, "resolved provenance");
    Ok(provenance)
}

fn rules_generates_control(rules: &str) -> bool {
    rules.lines().any(|line| {
        line.starts_with("debian/control:")
            || line.starts_with("debian/%: debian/%.in")
            || line.starts_with("include /usr/share/blends-dev/rules")
    })
}

fn build_depends_on(template: &str, package: &str) -> bool {
    let Ok(doc) = Document::parse_template(template) else {
        return false;
    };
    let build_depends = doc
        .paragraph(0)
        .and_then(|p| p.get("Build-Depends"))
        .unwrap_or("");
    match Relations::parse(build_depends) {
        Ok(relations) => relations.iter_relations(package).next().is_some(),
        Err(e) => {
            tracing::debug!(error = %e, "unparsable Build-Depends in template");
            false
        }
    }
}

/// Guess how a control template is expanded.
pub fn guess_template_type(template: &Path, debian_dir: Option<&Path>) -> Result<TemplateKind> {
    if let Some(dir) = debian_dir
        && let Some(rules) = deb_fs::read_text_if_exists(&dir.join("rules"))?
        && rules_generates_control(&rules)
    {
        return Ok(TemplateKind::Rules);
    }
    if template.is_dir() {
        return Ok(TemplateKind::Directory);
    }
    let text = deb_fs::read_text(template)?;
    let kind = if text.contains("@GNOME_TEAM@") {
        TemplateKind::Gnome
    } else if text.contains("@cdbs@") {
        TemplateKind::Cdbs
    } else if text.contains("PGVERSION") {
        TemplateKind::Postgresql
    } else if build_depends_on(&text, "gnome-pkg-tools") {
        TemplateKind::Gnome
    } else if build_depends_on(&text, "cdbs") {
        TemplateKind::Cdbs
    } else if debian_dir.is_some_and(|dir| dir.join("debcargo.toml").exists()) {
        TemplateKind::Debcargo
    } else {
        TemplateKind::Unknown
    };
    Ok(kind)
}

/// Make `make` consider the template newer than the target
fn bump_mtime(template: &Path, target: &Path) -> Result<()> {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|m| m.modified()).ok();
    let Some(target_mtime) = modified(target) else {
        return Ok(());
    };
    if modified(template).is_some_and(|t| t > target_mtime) {
        return Ok(());
    }
    let mtime = SystemTime::now().max(target_mtime + Duration::from_secs(1));
    File::options()
        .write(true)
        .open(template)
        .and_then(|f| f.set_modified(mtime))
        .map_err(|e| deb_fs::Error::io(template, e))?;
    Ok(())
}

/// Run the generator of `link` once, from the package root.
///
/// A generator that cannot be started or exits unsuccessfully is reported
/// as [`Error::GeneratedFile`] carrying the command and its stderr.
pub fn regenerate(link: &GeneratedLink) -> Result<()> {
    let (mut command, command_line) = match &link.kind {
        TemplateKind::Command(shell) => {
            let mut c = Command::new("sh");
            c.arg("-c").arg(shell);
            (c, shell.clone())
        }
        TemplateKind::Rules => {
            bump_mtime(&link.template, &link.target)?;
            let mut c = Command::new("./debian/rules");
            c.arg("debian/control");
            (c, "./debian/rules debian/control".to_string())
        }
        TemplateKind::Gnome => (Command::new("dh_gnome_clean"), "dh_gnome_clean".to_string()),
        TemplateKind::Postgresql => {
            let mut c = Command::new("pg_buildext");
            c.arg("updatecontrol");
            (c, "pg_buildext updatecontrol".to_string())
        }
        kind => return Err(link.refuse(format!("unable to expand {kind} template"))),
    };

    let root = package_root(&link.target);
    tracing::debug!(command = %command_line, root = %root.display(), "regenerating");
    let output = command.current_dir(&root).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            link.refuse(format!("{command_line}: command not found"))
        } else {
            link.refuse(format!("{command_line}: {e}"))
        }
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(link.refuse(format!(
            "{command_line} failed ({}): {}",
            output.status,
            stderr.trim_end()
        )));
    }
    Ok(())
}

/// Resolve a template conflict the way cdbs templates need it.
///
/// Only `Build-Depends` of the source paragraph is merged: when the edit
/// appended to the generated value, the appended part is kept with the
/// template's own value in front; otherwise every new relation that the
/// old value did not already imply is ensured in the template value.
pub fn resolve_cdbs_conflict(conflict: &Conflict<'_>, path: &Path) -> Result<Option<String>> {
    let (Some(baseline), Some(current), Some(new)) = (conflict.baseline, conflict.current, conflict.new)
    else {
        return Err(conflict.to_error(path));
    };
    if conflict.paragraph.field != "Source" || !conflict.field.eq_ignore_ascii_case("Build-Depends") {
        return Err(conflict.to_error(path));
    }
    if new.contains(baseline) {
        return Ok(Some(new.replace(baseline, current)));
    }

    let existing = Relations::parse(baseline)?;
    let mut merged = current.to_string();
    for entry in Relations::parse(new)?.entries() {
        if entry.is_formatting() {
            continue;
        }
        let implied = existing
            .entries()
            .iter()
            .any(|old| !old.is_formatting() && is_relation_implied(&entry.alternatives, &old.alternatives));
        if implied {
            continue;
        }
        let relation = entry
            .alternatives
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        merged = ensure_relation(&merged, &relation, None)?;
    }
    Ok(Some(merged))
}
