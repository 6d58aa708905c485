//! ---
//! dab_section: "03-config-logging"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Shared configuration, logging, and version metadata."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! Shared primitives for the DAB bridge daemon: configuration loading,
//! tracing bootstrap, and version metadata.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{AppConfig, DeviceConfig, LoadedAppConfig, LoggingConfig};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
