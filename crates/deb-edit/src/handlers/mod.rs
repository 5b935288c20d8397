//! Format handlers

mod changelog;
mod control;
mod copyright;
mod deb822;
mod debcargo;
mod lines;
mod lintian_overrides;
mod maintscript;
mod rules;
mod series;
mod watch;

pub use self::changelog::{
    ChangeBlock, Changelog, ChangelogHandler, NewBlock, distribution_is_unreleased,
    find_last_distribution, increment_version,
};
pub use self::control::{ControlFile, ControlHandler};
pub use self::copyright::{CopyrightFile, CopyrightHandler};
pub use self::deb822::Deb822Handler;
pub use self::debcargo::{DebcargoHandler, DottedKeys};
pub use self::lines::{Line, LineDocument, LineEntry, LineHandler};
pub use self::lintian_overrides::{LintianOverride, LintianOverridesHandler, OverrideType};
pub use self::maintscript::{MaintscriptEntry, MaintscriptHandler};
pub use self::rules::{
    Makefile, MakefileEntry, Rule, RulesHandler, RulesUpdate, check_cdbs, dh_invoke_add_with,
    dh_invoke_drop_argument, dh_invoke_drop_with, dh_invoke_get_with, dh_invoke_replace_argument,
    discard_pointless_override, discard_pointless_overrides, matches_wildcard, update_rules,
};
pub use self::series::{SeriesEntry, SeriesHandler, find_common_patch_suffix};
pub use self::watch::{WatchEntry, WatchFile, WatchHandler};
