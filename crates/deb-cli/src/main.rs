//! debmutate CLI
//!
//! Small packaging fixers built on the format-preserving editors in deb-edit.

mod cli;
mod commands;
mod config;
mod error;
mod report;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use commands::{Identity, Outcome};
use config::ScriptConfig;
use error::{CliError, Result};
use report::ScriptResult;

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    let config = ScriptConfig::from_cli(&cli);
    let result = execute_command(&config, &cli.command);

    if let Some(path) = &config.result_path {
        let report = match &result {
            Ok(outcome) => ScriptResult::success(outcome),
            Err(e) => ScriptResult::failure(e),
        };
        if let Err(e) = report.write(path) {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }

    match result {
        Ok(outcome) => println!("{} {}", "OK".green().bold(), outcome.description),
        Err(CliError::NothingToDo { message }) => {
            println!("{} {}", "Nothing to do:".yellow(), message);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            if let Some(diff) = e.diff() {
                eprintln!("{diff}");
            }
            std::process::exit(1);
        }
    }
}

fn execute_command(config: &ScriptConfig, cmd: &Commands) -> Result<Outcome> {
    tracing::debug!(directory = %config.directory.display(), ?cmd, "running command");
    match cmd {
        Commands::EnableRrr { force } => commands::run_enable_rrr(config, *force),
        Commands::DropMiaUploaders {
            mia,
            update_changelog,
            maintainer_name,
            maintainer_email,
        } => {
            let identity = Identity {
                name: maintainer_name.clone(),
                email: maintainer_email.clone(),
            };
            commands::run_drop_mia_uploaders(config, mia, *update_changelog, &identity)
        }
        Commands::SetField {
            field,
            value,
            package,
        } => commands::run_set_field(config, field, value, package.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deb_edit::EditorOptions;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> ScriptConfig {
        ScriptConfig {
            directory: dir.path().to_path_buf(),
            result_path: None,
            editor: EditorOptions::new(),
        }
    }

    #[test]
    fn test_dispatch_set_field() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("debian")).unwrap();
        fs::write(dir.path().join("debian/control"), "Source: foo\n").unwrap();

        let cmd = Commands::SetField {
            field: "Section".into(),
            value: "devel".into(),
            package: None,
        };
        let outcome = execute_command(&config(&dir), &cmd).unwrap();
        assert_eq!(outcome.context["changed_files"][0], "debian/control");
    }

    #[test]
    fn test_dispatch_missing_control() {
        let dir = TempDir::new().unwrap();
        let err = execute_command(&config(&dir), &Commands::EnableRrr { force: false }).unwrap_err();
        assert_eq!(err.result_code(), "io-error");
    }
}
