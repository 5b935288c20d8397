//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Edit Debian packaging files without disturbing their formatting
#[derive(Parser, Debug)]
#[command(name = "debmutate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Package directory containing debian/
    #[arg(short = 'd', long, global = true, default_value = ".")]
    pub directory: PathBuf,

    /// Whether files may be reformatted when they cannot be preserved
    #[arg(long, env = "REFORMATTING", global = true, value_enum, default_value_t = Reformatting::Disallow)]
    pub reformatting: Reformatting,

    /// Shell command that regenerates debian/control from its template
    #[arg(long, env = "DEBMUTATE_REGENERATE", global = true)]
    pub regenerate_command: Option<String>,

    /// Set to 1 to write a result file
    #[arg(long, env = "SVP_API", global = true, hide = true)]
    pub svp_api: Option<String>,

    /// Path of the JSON result file
    #[arg(long, env = "SVP_RESULT", global = true, hide = true)]
    pub svp_result: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reformatting {
    Allow,
    Disallow,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Set Rules-Requires-Root: no in the source paragraph
    ///
    /// Examples:
    ///   debmutate enable-rrr
    ///   debmutate enable-rrr --force   # Replace another value
    EnableRrr {
        /// Overwrite an existing Rules-Requires-Root value
        #[arg(long)]
        force: bool,
    },

    /// Remove uploaders that are missing in action
    ///
    /// Examples:
    ///   debmutate drop-mia-uploaders --mia bob@example.com
    ///   debmutate drop-mia-uploaders --mia a@x --mia b@x --update-changelog
    DropMiaUploaders {
        /// Email address of an uploader to remove
        #[arg(long = "mia", required = true)]
        mia: Vec<String>,

        /// Record the removal in debian/changelog
        #[arg(long)]
        update_changelog: bool,

        /// Name used for a new changelog entry
        #[arg(long, env = "DEBFULLNAME")]
        maintainer_name: Option<String>,

        /// Email used for a new changelog entry
        #[arg(long, env = "DEBEMAIL")]
        maintainer_email: Option<String>,
    },

    /// Set a field in the source or a binary paragraph of debian/control
    SetField {
        /// Field name
        field: String,

        /// New value
        value: String,

        /// Binary package to edit instead of the source paragraph
        #[arg(short, long)]
        package: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_enable_rrr() {
        let cli = Cli::try_parse_from(["debmutate", "enable-rrr", "--force"]).unwrap();
        assert_eq!(cli.command, Commands::EnableRrr { force: true });
        assert_eq!(cli.directory, PathBuf::from("."));
    }

    #[test]
    fn parse_drop_mia_uploaders() {
        let cli = Cli::try_parse_from([
            "debmutate",
            "drop-mia-uploaders",
            "--mia",
            "a@x",
            "--mia",
            "b@x",
            "--update-changelog",
            "--maintainer-name",
            "Jane",
        ])
        .unwrap();
        match cli.command {
            Commands::DropMiaUploaders {
                mia,
                update_changelog,
                maintainer_name,
                ..
            } => {
                assert_eq!(mia, vec!["a@x", "b@x"]);
                assert!(update_changelog);
                assert_eq!(maintainer_name.as_deref(), Some("Jane"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn drop_mia_uploaders_needs_an_address() {
        assert!(Cli::try_parse_from(["debmutate", "drop-mia-uploaders"]).is_err());
    }

    #[test]
    fn parse_set_field() {
        let cli = Cli::try_parse_from([
            "debmutate", "-d", "pkg", "set-field", "Section", "devel", "--package", "foo",
        ])
        .unwrap();
        assert_eq!(cli.directory, PathBuf::from("pkg"));
        assert_eq!(
            cli.command,
            Commands::SetField {
                field: "Section".into(),
                value: "devel".into(),
                package: Some("foo".into()),
            }
        );
    }

    #[test]
    fn parse_reformatting() {
        let cli = Cli::try_parse_from(["debmutate", "--reformatting", "allow", "enable-rrr"]).unwrap();
        assert_eq!(cli.reformatting, Reformatting::Allow);
    }
}
