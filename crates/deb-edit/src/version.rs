//! Debian package version strings and their ordering
//!
//! Versions are `debversion::Version`; this module adds the error mapping
//! and the serde glue used by the handlers.

use serde::Serializer;

use crate::error::{Error, Result};

pub use debversion::Version;

/// Parse `[epoch:]upstream_version[-debian_revision]`
pub fn parse_version(text: &str) -> Result<Version> {
    text.trim()
        .parse::<Version>()
        .map_err(|e| Error::InvalidVersion {
            version: text.to_string(),
            message: e.to_string(),
        })
}

/// Serialize an optional version in its string form
pub(crate) fn serialize_optional<S: Serializer>(
    version: &Option<Version>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match version {
        Some(version) => serializer.serialize_some(&version.to_string()),
        None => serializer.serialize_none(),
    }
}
