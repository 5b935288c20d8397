//! debhelper compat levels and build dependencies

use std::path::Path;

use tracing::debug;

use crate::deb822::{Document, Paragraph};
use crate::error::{Error, Result};
use crate::relations::{Constraint, Relations, ensure_minimum_version};
use crate::version::Version;

fn refuse(reason: impl Into<String>) -> Error {
    Error::Debhelper {
        reason: reason.into(),
    }
}

/// Require at least `minimum` of debhelper in `Build-Depends`.
///
/// A `debhelper-compat (= N)` relation with `N >= minimum` already
/// satisfies the requirement. debhelper relations in `Build-Depends-Arch`
/// or `Build-Depends-Indep` are refused.
pub fn ensure_minimum_debhelper_version(source: &mut Paragraph, minimum: &Version) -> Result<bool> {
    for field in ["Build-Depends-Arch", "Build-Depends-Indep"] {
        let relations = Relations::parse(source.get(field).unwrap_or_default())?;
        for package in ["debhelper-compat", "debhelper"] {
            if relations.iter_relations(package).next().is_some() {
                return Err(refuse(format!("{package} in {field}")));
            }
        }
    }

    let build_depends = source.get("Build-Depends").unwrap_or_default().to_string();
    let relations = Relations::parse(&build_depends)?;
    if let Some((_, entry)) = relations.get_relation("debhelper-compat")? {
        match entry.alternatives[0].version() {
            None => return Err(refuse("debhelper-compat without version")),
            Some((Constraint::Equal, level)) if level >= minimum => return Ok(false),
            Some((Constraint::Equal, _)) => {}
            Some((constraint, _)) => {
                return Err(refuse(format!("debhelper-compat with {constraint} constraint")));
            }
        }
    }

    let updated = ensure_minimum_version(&build_depends, "debhelper", minimum)?;
    if updated == build_depends && source.contains("Build-Depends") {
        return Ok(false);
    }
    debug!(minimum = %minimum, "Raising debhelper build dependency");
    source.set("Build-Depends", updated)?;
    Ok(true)
}

/// Read the level from a `debian/compat` file
pub fn read_debhelper_compat_file(path: &Path) -> Result<u32> {
    let text = deb_fs::read_text(path)?;
    let line = text.lines().next().unwrap_or_default();
    let level = line.split('#').next().unwrap_or_default().trim();
    level
        .parse()
        .map_err(|_| Error::parse(1, format!("invalid compat level {level:?}")).with_path(path))
}

/// Compat level declared by a source paragraph.
///
/// `X-DH-Compat` wins over a `debhelper-compat (= N)` build dependency.
/// Relations offering debhelper-compat as an alternative are ignored.
pub fn get_debhelper_compat_level_from_control(source: &Paragraph) -> Result<Option<u32>> {
    if let Some(value) = source.get("X-DH-Compat").filter(|v| !v.is_empty()) {
        return value
            .parse()
            .map(Some)
            .map_err(|_| refuse(format!("invalid X-DH-Compat value {value:?}")));
    }
    let relations = Relations::parse(source.get("Build-Depends").unwrap_or_default())?;
    let Ok(Some((_, entry))) = relations.get_relation("debhelper-compat") else {
        return Ok(None);
    };
    match entry.alternatives[0].version() {
        None => Ok(None),
        Some((_, level)) => level
            .to_string()
            .parse()
            .map(Some)
            .map_err(|_| refuse(format!("invalid debhelper-compat level {level}"))),
    }
}

/// Compat level of the package rooted at `package_dir`.
///
/// `debian/compat` is consulted first, then `debian/control`.
pub fn get_debhelper_compat_level(package_dir: &Path) -> Result<Option<u32>> {
    let compat = package_dir.join("debian/compat");
    if compat.exists() {
        return read_debhelper_compat_file(&compat).map(Some);
    }
    let control = package_dir.join("debian/control");
    let Some(text) = deb_fs::read_text_if_exists(&control)? else {
        return Ok(None);
    };
    let document = Document::parse(&text).map_err(|e| e.with_path(&control))?;
    match document.paragraph(0) {
        Some(source) => get_debhelper_compat_level_from_control(source),
        None => Ok(None),
    }
}

/// dh sequences enabled through `dh-sequence-*` build dependencies
pub fn dh_sequences(source: &Paragraph) -> Result<Vec<String>> {
    let relations = Relations::parse(source.get("Build-Depends").unwrap_or_default())?;
    Ok(relations
        .entries()
        .iter()
        .flat_map(|entry| entry.names())
        .filter_map(|name| name.strip_prefix("dh-sequence-"))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_version;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn source(build_depends: &str) -> Paragraph {
        Paragraph::from_fields([("Source", "foo"), ("Build-Depends", build_depends)])
    }

    fn ensure(source: &mut Paragraph, minimum: &str) -> Result<bool> {
        ensure_minimum_debhelper_version(source, &parse_version(minimum).unwrap())
    }

    #[rstest]
    #[case("debhelper (>= 9)", "10", true, "debhelper (>= 10)")]
    #[case("debhelper (>= 11)", "10", false, "debhelper (>= 11)")]
    #[case("libfoo-dev", "10", true, "libfoo-dev, debhelper (>= 10)")]
    #[case("debhelper-compat (= 12)", "11", false, "debhelper-compat (= 12)")]
    #[case(
        "debhelper-compat (= 10), libfoo-dev",
        "11",
        true,
        "debhelper-compat (= 10), libfoo-dev, debhelper (>= 11)"
    )]
    fn minimum_version(
        #[case] build_depends: &str,
        #[case] minimum: &str,
        #[case] changed: bool,
        #[case] expected: &str,
    ) {
        let mut source = source(build_depends);
        assert_eq!(ensure(&mut source, minimum).unwrap(), changed);
        assert_eq!(source.get("Build-Depends"), Some(expected));
    }

    #[test]
    fn minimum_version_without_build_depends() {
        let mut source = Paragraph::from_fields([("Source", "foo")]);
        assert!(ensure(&mut source, "12").unwrap());
        assert_eq!(source.get("Build-Depends"), Some("debhelper (>= 12)"));
    }

    #[rstest]
    #[case("Build-Depends-Indep", "debhelper (>= 9)")]
    #[case("Build-Depends-Arch", "debhelper-compat (= 12)")]
    fn minimum_version_refuses_split_build_depends(#[case] field: &str, #[case] value: &str) {
        let mut source = Paragraph::from_fields([("Source", "foo"), (field, value)]);
        assert!(matches!(ensure(&mut source, "12"), Err(Error::Debhelper { .. })));
    }

    #[rstest]
    #[case("debhelper-compat")]
    #[case("debhelper-compat (>= 12)")]
    fn minimum_version_refuses_loose_compat(#[case] build_depends: &str) {
        let mut source = source(build_depends);
        assert!(matches!(ensure(&mut source, "12"), Err(Error::Debhelper { .. })));
        assert_eq!(source.get("Build-Depends"), Some(build_depends));
    }

    #[rstest]
    #[case(&[("X-DH-Compat", "14"), ("Build-Depends", "debhelper-compat (= 13)")], Some(14))]
    #[case(&[("Build-Depends", "libfoo-dev, debhelper-compat (= 13)")], Some(13))]
    #[case(&[("Build-Depends", "debhelper-compat | debhelper (>= 9)")], None)]
    #[case(&[("Build-Depends", "debhelper (>= 9)")], None)]
    fn compat_level_from_control(#[case] fields: &[(&str, &str)], #[case] expected: Option<u32>) {
        let source = Paragraph::from_fields(fields.iter().copied());
        assert_eq!(get_debhelper_compat_level_from_control(&source).unwrap(), expected);
    }

    #[test]
    fn compat_level_rejects_bad_x_dh_compat() {
        let source = Paragraph::from_fields([("X-DH-Compat", "thirteen")]);
        assert!(get_debhelper_compat_level_from_control(&source).is_err());
    }

    #[test]
    fn compat_file_wins_over_control() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("debian")).unwrap();
        fs::write(
            dir.path().join("debian/control"),
            "Source: foo\nBuild-Depends: debhelper-compat (= 13)\n",
        )
        .unwrap();
        assert_eq!(get_debhelper_compat_level(dir.path()).unwrap(), Some(13));

        fs::write(dir.path().join("debian/compat"), "10 # legacy\n").unwrap();
        assert_eq!(get_debhelper_compat_level(dir.path()).unwrap(), Some(10));
    }

    #[test]
    fn compat_level_of_empty_package() {
        let dir = TempDir::new().unwrap();
        assert_eq!(get_debhelper_compat_level(dir.path()).unwrap(), None);
    }

    #[test]
    fn invalid_compat_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("compat");
        fs::write(&path, "ten\n").unwrap();
        assert!(matches!(read_debhelper_compat_file(&path), Err(Error::Parse { .. })));
    }

    #[test]
    fn sequences() {
        let source = source("debhelper-compat (= 13), dh-sequence-python3, dh-sequence-sphinxdoc <!nodoc>");
        assert_eq!(dh_sequences(&source).unwrap(), vec!["python3", "sphinxdoc"]);
    }
}
