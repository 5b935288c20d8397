//! Script configuration assembled from arguments and environment

use std::path::{Path, PathBuf};

use deb_edit::EditorOptions;

use crate::cli::{Cli, Reformatting};

/// Everything a command needs to know about its invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConfig {
    /// Package directory containing debian/
    pub directory: PathBuf,
    /// Where to write the JSON result, when result reporting is enabled
    pub result_path: Option<PathBuf>,
    pub editor: EditorOptions,
}

impl ScriptConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let result_path = cli
            .svp_result
            .clone()
            .filter(|_| cli.svp_api.as_deref() == Some("1"));
        let mut editor = EditorOptions::new().allow_reformatting(cli.reformatting == Reformatting::Allow);
        editor.regenerate_command = cli.regenerate_command.clone();
        Self {
            directory: cli.directory.clone(),
            result_path,
            editor,
        }
    }

    /// Path of a file below debian/
    pub fn debian_path(&self, name: &str) -> PathBuf {
        self.directory.join("debian").join(name)
    }

    pub fn control_path(&self) -> PathBuf {
        self.debian_path("control")
    }

    /// Display a path relative to the package directory
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.directory).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Commands;

    fn cli(svp_api: Option<&str>, svp_result: Option<&str>) -> Cli {
        Cli {
            verbose: false,
            directory: PathBuf::from("pkg"),
            reformatting: Reformatting::Disallow,
            regenerate_command: Some("make -f debian/rules debian/control".into()),
            svp_api: svp_api.map(str::to_string),
            svp_result: svp_result.map(PathBuf::from),
            command: Commands::EnableRrr { force: false },
        }
    }

    #[test]
    fn result_path_requires_api_flag() {
        assert_eq!(ScriptConfig::from_cli(&cli(None, Some("out.json"))).result_path, None);
        assert_eq!(ScriptConfig::from_cli(&cli(Some("0"), Some("out.json"))).result_path, None);
        assert_eq!(
            ScriptConfig::from_cli(&cli(Some("1"), Some("out.json"))).result_path,
            Some(PathBuf::from("out.json"))
        );
    }

    #[test]
    fn editor_options_follow_cli() {
        let config = ScriptConfig::from_cli(&cli(None, None));
        assert!(!config.editor.allow_reformatting);
        assert_eq!(
            config.editor.regenerate_command.as_deref(),
            Some("make -f debian/rules debian/control")
        );
        assert_eq!(config.control_path(), PathBuf::from("pkg/debian/control"));
    }

    #[test]
    fn relative_paths() {
        let config = ScriptConfig::from_cli(&cli(None, None));
        assert_eq!(
            config.relative(Path::new("pkg/debian/control")),
            Path::new("debian/control")
        );
        assert_eq!(config.relative(Path::new("/other")), Path::new("/other"));
    }
}
