//! ---
//! dab_section: "03-config-logging"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Shared configuration, logging, and version metadata."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
use serde::Serialize;

/// Build-time version metadata.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Workspace semantic version.
    pub semver: String,
    /// Git commit hash captured at build time, when available.
    pub git_sha: String,
    /// Build timestamp from the compilation environment.
    pub build_timestamp: String,
}

impl VersionInfo {
    /// Construct a new [`VersionInfo`] instance using environment metadata.
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            git_sha: option_env!("DAB_BUILD_GIT_SHA").unwrap_or("UNKNOWN").to_owned(),
            build_timestamp: option_env!("DAB_BUILD_TIMESTAMP")
                .unwrap_or("UNKNOWN")
                .to_owned(),
        }
    }

    /// Human readable banner used in logging surfaces.
    #[must_use]
    pub fn banner(&self) -> String {
        format!("dab-bridge v{} (git {})", self.semver, self.git_sha)
    }

    /// Extended string suitable for `--version` flags.
    #[must_use]
    pub fn extended(&self) -> String {
        format!(
            "{banner}\nBuilt: {built}",
            banner = self.banner(),
            built = self.build_timestamp
        )
    }
}
