//! dh_installdeb maintscript files

use serde::Serialize;

use super::lines::{LineDocument, LineEntry, LineHandler};
use crate::format::Format;
use crate::version::{Version, parse_version};

/// A maintscript directive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "directive", rename_all = "snake_case")]
pub enum MaintscriptEntry {
    Supports {
        command: String,
    },
    RmConffile {
        conffile: String,
        #[serde(serialize_with = "crate::version::serialize_optional")]
        prior_version: Option<Version>,
        package: Option<String>,
    },
    MvConffile {
        old_conffile: String,
        new_conffile: String,
        #[serde(serialize_with = "crate::version::serialize_optional")]
        prior_version: Option<Version>,
        package: Option<String>,
    },
    SymlinkToDir {
        pathname: String,
        old_target: String,
        #[serde(serialize_with = "crate::version::serialize_optional")]
        prior_version: Option<Version>,
        package: Option<String>,
    },
    DirToSymlink {
        pathname: String,
        new_target: String,
        #[serde(serialize_with = "crate::version::serialize_optional")]
        prior_version: Option<Version>,
        package: Option<String>,
    },
}

/// Split the optional `[prior-version [package]]` tail of a directive
fn version_and_package(
    args: &[&str],
) -> Result<(Option<Version>, Option<String>), String> {
    if args.len() > 2 {
        return Err(format!("too many arguments: {}", args.join(" ")));
    }
    let version = args
        .first()
        .map(|v| parse_version(v).map_err(|e| e.to_string()))
        .transpose()?;
    Ok((version, args.get(1).map(|p| p.to_string())))
}

impl MaintscriptEntry {
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Supports { .. } => "supports",
            Self::RmConffile { .. } => "rm_conffile",
            Self::MvConffile { .. } => "mv_conffile",
            Self::SymlinkToDir { .. } => "symlink_to_dir",
            Self::DirToSymlink { .. } => "dir_to_symlink",
        }
    }

    /// The directive and its arguments
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.directive().to_string()];
        let tail = match self {
            Self::Supports { command } => {
                args.push(command.clone());
                return args;
            }
            Self::RmConffile {
                conffile,
                prior_version,
                package,
            } => {
                args.push(conffile.clone());
                (prior_version, package)
            }
            Self::MvConffile {
                old_conffile: first,
                new_conffile: second,
                prior_version,
                package,
            }
            | Self::SymlinkToDir {
                pathname: first,
                old_target: second,
                prior_version,
                package,
            }
            | Self::DirToSymlink {
                pathname: first,
                new_target: second,
                prior_version,
                package,
            } => {
                args.push(first.clone());
                args.push(second.clone());
                (prior_version, package)
            }
        };
        if let (Some(version), package) = tail {
            args.push(version.to_string());
            if let Some(package) = package {
                args.push(package.clone());
            }
        }
        args
    }
}

impl LineEntry for MaintscriptEntry {
    const FORMAT: Format = Format::Maintscript;

    fn parse_line(line: &str) -> Result<Option<Self>, String> {
        if line.starts_with('#') {
            return Ok(None);
        }
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some((&directive, rest)) = args.split_first() else {
            return Ok(None);
        };
        let missing = || format!("{directive}: missing arguments");
        let entry = match directive {
            "supports" => match rest {
                [command] => Self::Supports {
                    command: command.to_string(),
                },
                _ => return Err(missing()),
            },
            "rm_conffile" => {
                let (conffile, tail) = rest.split_first().ok_or_else(missing)?;
                let (prior_version, package) = version_and_package(tail)?;
                Self::RmConffile {
                    conffile: conffile.to_string(),
                    prior_version,
                    package,
                }
            }
            "mv_conffile" | "symlink_to_dir" | "dir_to_symlink" => {
                if rest.len() < 2 {
                    return Err(missing());
                }
                let (first, second) = (rest[0].to_string(), rest[1].to_string());
                let (prior_version, package) = version_and_package(&rest[2..])?;
                match directive {
                    "mv_conffile" => Self::MvConffile {
                        old_conffile: first,
                        new_conffile: second,
                        prior_version,
                        package,
                    },
                    "symlink_to_dir" => Self::SymlinkToDir {
                        pathname: first,
                        old_target: second,
                        prior_version,
                        package,
                    },
                    _ => Self::DirToSymlink {
                        pathname: first,
                        new_target: second,
                        prior_version,
                        package,
                    },
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(entry))
    }

    fn render_line(&self) -> String {
        self.args().join(" ")
    }
}

pub type MaintscriptHandler = LineHandler<MaintscriptEntry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHandler;
    use pretty_assertions::assert_eq;

    const MAINTSCRIPT: &str = "\
# Removed in 2.0
rm_conffile /etc/foo.conf 2.0-1~ foo
mv_conffile /etc/old.conf /etc/new.conf 1.5
supports preinst
";

    #[test]
    fn test_roundtrip() {
        let handler = MaintscriptHandler::new();
        let doc = handler.parse(MAINTSCRIPT).unwrap();
        assert_eq!(handler.render(&doc), MAINTSCRIPT);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_parse_directives() {
        let doc = LineDocument::<MaintscriptEntry>::parse(MAINTSCRIPT).unwrap();
        match doc.get(0).unwrap() {
            MaintscriptEntry::RmConffile {
                conffile,
                prior_version,
                package,
            } => {
                assert_eq!(conffile, "/etc/foo.conf");
                assert_eq!(prior_version.as_ref().unwrap().to_string(), "2.0-1~");
                assert_eq!(package.as_deref(), Some("foo"));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
        assert_eq!(doc.get(2).unwrap().directive(), "supports");
    }

    #[test]
    fn test_remove_entry() {
        let mut doc = LineDocument::<MaintscriptEntry>::parse(MAINTSCRIPT).unwrap();
        let removed = doc.remove(1).unwrap();
        assert_eq!(removed.directive(), "mv_conffile");
        assert!(doc.remove(5).is_none());
        assert_eq!(
            doc.render(),
            "# Removed in 2.0\nrm_conffile /etc/foo.conf 2.0-1~ foo\nsupports preinst\n"
        );
    }

    #[test]
    fn test_push_entry() {
        let mut doc = LineDocument::<MaintscriptEntry>::new();
        doc.push(MaintscriptEntry::DirToSymlink {
            pathname: "/usr/share/doc/foo".into(),
            new_target: "bar".into(),
            prior_version: Some(parse_version("1.0-2").unwrap()),
            package: None,
        });
        assert_eq!(doc.render(), "dir_to_symlink /usr/share/doc/foo bar 1.0-2\n");
    }

    #[test]
    fn test_invalid_arguments() {
        let err = LineDocument::<MaintscriptEntry>::parse("mv_conffile /etc/a\n").unwrap_err();
        assert!(matches!(err, crate::error::Error::Parse { line: 1, .. }));
    }
}
