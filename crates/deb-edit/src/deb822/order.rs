//! Canonical field orders used when inserting new fields

use serde::{Deserialize, Serialize};

const SOURCE: &[&str] = &[
    "Source",
    "Section",
    "Priority",
    "Maintainer",
    "Uploaders",
    "Build-Depends",
    "Build-Depends-Indep",
    "Build-Depends-Arch",
    "Build-Conflicts",
    "Build-Conflicts-Indep",
    "Build-Conflicts-Arch",
    "Standards-Version",
    "Vcs-Browser",
    "Vcs-Git",
    "Vcs-Svn",
    "Vcs-Bzr",
    "Vcs-Hg",
    "Vcs-Darcs",
    "Vcs-Cvs",
    "Vcs-Arch",
    "Vcs-Mtn",
    "Homepage",
    "Rules-Requires-Root",
    "Testsuite",
    "Testsuite-Triggers",
];

const BINARY: &[&str] = &[
    "Package",
    "Architecture",
    "Section",
    "Priority",
    "Multi-Arch",
    "Essential",
    "Build-Profiles",
    "Built-Using",
    "Pre-Depends",
    "Depends",
    "Recommends",
    "Suggests",
    "Enhances",
    "Replaces",
    "Conflicts",
    "Breaks",
    "Provides",
    "Description",
];

const COPYRIGHT_HEADER: &[&str] = &[
    "Format",
    "Upstream-Name",
    "Upstream-Contact",
    "Source",
    "Disclaimer",
    "Comment",
    "License",
    "Copyright",
];

const COPYRIGHT_FILES: &[&str] = &["Files", "Copyright", "License", "Comment"];

const COPYRIGHT_LICENSE: &[&str] = &["License", "Comment"];

/// Field order a paragraph follows when new fields are added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOrder {
    /// No known order: new fields are appended
    #[default]
    Unordered,
    Source,
    Binary,
    CopyrightHeader,
    CopyrightFiles,
    CopyrightLicense,
}

impl FieldOrder {
    pub fn canonical(&self) -> &'static [&'static str] {
        match self {
            Self::Unordered => &[],
            Self::Source => SOURCE,
            Self::Binary => BINARY,
            Self::CopyrightHeader => COPYRIGHT_HEADER,
            Self::CopyrightFiles => COPYRIGHT_FILES,
            Self::CopyrightLicense => COPYRIGHT_LICENSE,
        }
    }

    /// Rank of a field name in the canonical order
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.canonical()
            .iter()
            .position(|known| known.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_is_case_insensitive() {
        assert_eq!(FieldOrder::Binary.rank("depends"), Some(9));
        assert_eq!(FieldOrder::Source.rank("Source"), Some(0));
    }

    #[test]
    fn unknown_fields_have_no_rank() {
        assert_eq!(FieldOrder::Source.rank("XS-Vcs-Git"), None);
        assert_eq!(FieldOrder::Unordered.rank("Source"), None);
    }
}
