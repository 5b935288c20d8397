//! `Vcs-*` fields of source packages and gbp tag names

use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;

use crate::deb822::Paragraph;
use crate::error::{Error, Result};

static SUBPATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \[([^] ]+)\]").unwrap());
static VERSION_MANGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%\(version%(?P<M>[^%])%(?P<R>(?:[^%]|\\%)+)\)s").unwrap()
});

/// A Debian Vcs URL: `<repository> [-b <branch>] [<subpath>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsUrl {
    pub repo_url: String,
    pub branch: Option<String>,
    pub subpath: Option<String>,
}

impl VcsUrl {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            branch: None,
            subpath: None,
        }
    }
}

impl Display for VcsUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&unsplit_vcs_url(
            &self.repo_url,
            self.branch.as_deref(),
            self.subpath.as_deref(),
        ))
    }
}

/// Split a Vcs URL into repository, branch and subpath.
///
/// The `[subpath]` part may appear before or after `-b branch`.
pub fn split_vcs_url(url: &str) -> VcsUrl {
    let (rest, subpath) = match SUBPATH.captures(url) {
        Some(caps) => {
            let (whole, subpath) = (&caps[0], &caps[1]);
            (url.replacen(whole, "", 1), Some(subpath.to_string()))
        }
        None => (url.to_string(), None),
    };
    match rest.split_once(" -b ") {
        Some((repo_url, branch)) => VcsUrl {
            repo_url: repo_url.to_string(),
            branch: Some(branch.to_string()),
            subpath,
        },
        None => VcsUrl {
            repo_url: rest,
            branch: None,
            subpath,
        },
    }
}

pub fn unsplit_vcs_url(repo_url: &str, branch: Option<&str>, subpath: Option<&str>) -> String {
    let mut url = repo_url.to_string();
    if let Some(branch) = branch.filter(|b| !b.is_empty()) {
        url.push_str(" -b ");
        url.push_str(branch);
    }
    if let Some(subpath) = subpath.filter(|s| !s.is_empty()) {
        url.push_str(" [");
        url.push_str(subpath);
        url.push(']');
    }
    url
}

/// Version control details declared by a source paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsInfo {
    pub vcs: &'static str,
    pub repo_url: String,
    pub subpath: Option<String>,
}

/// The first of `Vcs-Git`, `Vcs-Bzr`, `Vcs-Svn` and `Vcs-Hg` present.
///
/// Git and Mercurial URLs are split; the branch is not reported.
pub fn get_vcs_info(source: &Paragraph) -> Option<VcsInfo> {
    for vcs in ["Git", "Bzr", "Svn", "Hg"] {
        let Some(value) = source.get(&format!("Vcs-{vcs}")) else {
            continue;
        };
        let info = match vcs {
            "Git" | "Hg" => {
                let url = split_vcs_url(value);
                VcsInfo {
                    vcs,
                    repo_url: url.repo_url,
                    subpath: url.subpath,
                }
            }
            _ => VcsInfo {
                vcs,
                repo_url: value.to_string(),
                subpath: None,
            },
        };
        return Some(info);
    }
    None
}

/// Mangle a version for use in a git tag (DEP-14)
pub fn mangle_version_for_git(version: &str) -> String {
    let mut mangled = version.replace('~', "_").replace(':', "%").replace("..", ".#.");
    if mangled.ends_with('.') {
        mangled.push('#');
    }
    if let Some(stem) = mangled.strip_suffix(".lock") {
        mangled = format!("{stem}.#lock");
    }
    mangled
}

/// Vcs type and URL of a source paragraph.
///
/// `Vcs-*` fields win over `XS-Vcs-*`, which win over `X-Vcs-*`;
/// `*-Browser` fields are skipped.
pub fn source_package_vcs(source: &Paragraph) -> Option<(String, String)> {
    ["Vcs-", "XS-Vcs-", "X-Vcs-"].iter().find_map(|prefix| {
        source.items().find_map(|(name, value)| {
            let vcs = name.strip_prefix(*prefix)?;
            (vcs != "Browser").then(|| (vcs.to_string(), value.to_string()))
        })
    })
}

/// Expand a gbp `debian-tag` format such as `debian/%(version)s`.
///
/// Supports the `%(version%<from>%<to>)s` mangling syntax and the
/// `version` and `hversion` variables.
pub fn gbp_expand_tag_name(tag_format: &str, version: &str) -> Result<String> {
    let mut version = version.to_string();
    let mut format = tag_format.to_string();
    if let Some(caps) = VERSION_MANGLE.captures(tag_format) {
        let from = &caps["M"];
        let to = caps["R"].replace(r"\%", "%");
        version = version.replace(from, &to);
        format = VERSION_MANGLE.replace_all(tag_format, "%(version)s").into_owned();
    }
    let hversion = version.replace('.', "-");

    let unknown = |variable: &str| Error::TagFormat {
        tag: tag_format.to_string(),
        variable: variable.to_string(),
    };
    let mut expanded = String::new();
    let mut rest = format.as_str();
    while let Some(index) = rest.find('%') {
        expanded.push_str(&rest[..index]);
        rest = &rest[index + 1..];
        if let Some(after) = rest.strip_prefix('%') {
            expanded.push('%');
            rest = after;
            continue;
        }
        let Some((name, after)) = rest.strip_prefix('(').and_then(|r| r.split_once(")s")) else {
            return Err(unknown(rest));
        };
        match name {
            "version" => expanded.push_str(&version),
            "hversion" => expanded.push_str(&hversion),
            other => return Err(unknown(other)),
        }
        rest = after;
    }
    expanded.push_str(rest);
    Ok(expanded)
}
