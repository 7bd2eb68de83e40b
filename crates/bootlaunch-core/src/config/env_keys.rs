//! Environment variable key constants.
//!
//! Every key uses the `BOOTLAUNCH_*` prefix. Alias slices exist so a key can
//! be renamed later without breaking existing deployments.

/// Directory layout
pub mod paths {
    /// Override for the base directory (defaults to the executable's directory when packaged).
    pub const BOOTLAUNCH_BASE_DIR: &str = "BOOTLAUNCH_BASE_DIR";

    /// Root of the embedded bundle supplied by the packaging runtime.
    pub const BOOTLAUNCH_BUNDLE_DIR: &str = "BOOTLAUNCH_BUNDLE_DIR";

    /// Name of the isolated environment directory under the base directory.
    pub const BOOTLAUNCH_ENV_DIR_NAME: &str = "BOOTLAUNCH_ENV_DIR_NAME";
    pub const ENV_DIR_NAME_ALIASES: &[&str] = &["BOOTLAUNCH_VENV_NAME"];

    /// Per-user temp directory that receives extracted tools.
    pub const BOOTLAUNCH_EXTRACT_DIR: &str = "BOOTLAUNCH_EXTRACT_DIR";
}

/// Payload and dependency manifest
pub mod payload {
    pub const BOOTLAUNCH_PAYLOAD: &str = "BOOTLAUNCH_PAYLOAD";
    pub const BOOTLAUNCH_MANIFEST: &str = "BOOTLAUNCH_MANIFEST";

    /// Module imported by the verification probe.
    pub const BOOTLAUNCH_PROBE_MODULE: &str = "BOOTLAUNCH_PROBE_MODULE";
}

/// Provisioning tool selection
pub mod tools {
    /// "auto" (default), "fast" or "standard".
    pub const BOOTLAUNCH_TOOL: &str = "BOOTLAUNCH_TOOL";

    /// Ambient interpreter used by the standard toolchain and degraded handoff.
    pub const BOOTLAUNCH_PYTHON: &str = "BOOTLAUNCH_PYTHON";
}

/// Subprocess bounds, in seconds
pub mod timeouts {
    pub const BOOTLAUNCH_VERSION_TIMEOUT_SECS: &str = "BOOTLAUNCH_VERSION_TIMEOUT_SECS";
    pub const BOOTLAUNCH_PROBE_TIMEOUT_SECS: &str = "BOOTLAUNCH_PROBE_TIMEOUT_SECS";
    pub const BOOTLAUNCH_CREATE_TIMEOUT_SECS: &str = "BOOTLAUNCH_CREATE_TIMEOUT_SECS";
    pub const BOOTLAUNCH_INSTALL_TIMEOUT_SECS: &str = "BOOTLAUNCH_INSTALL_TIMEOUT_SECS";
}

/// Observability and logging
pub mod observability {
    pub const BOOTLAUNCH_QUIET: &str = "BOOTLAUNCH_QUIET";
    pub const BOOTLAUNCH_LOG_LEVEL: &str = "BOOTLAUNCH_LOG_LEVEL";
    pub const BOOTLAUNCH_LOG_JSON: &str = "BOOTLAUNCH_LOG_JSON";
}
