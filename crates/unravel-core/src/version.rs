//! Version and output-schema metadata reported by `unravel version`.

use serde::Serialize;
use std::fmt;

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version of the `--json` summary objects.
/// Bump this when changing field names or meanings.
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// What a build of unravel reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub schema_version: u32,
    /// Commit the binary was built from, when `UNRAVEL_BUILD_GIT_HASH` was set at build time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<&'static str>,
    /// Transforms this build provides, by command name.
    pub transforms: [&'static str; 2],
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            version: VERSION,
            schema_version: SUMMARY_SCHEMA_VERSION,
            git_hash: option_env!("UNRAVEL_BUILD_GIT_HASH"),
            transforms: ["rename", "strings"],
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unravel {}", self.version)?;
        if let Some(hash) = self.git_hash {
            write!(f, " ({hash})")?;
        }
        Ok(())
    }
}
