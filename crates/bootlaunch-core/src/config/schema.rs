//! 按领域分组的配置结构体
//!
//! 启动时从 [`ConfigSource`] 构造一次，之后作为值传递。

use super::env_keys::{observability as obv_keys, paths, payload, timeouts, tools};
use super::loader::ConfigSource;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENV_DIR_NAME: &str = ".venv";
pub const DEFAULT_MANIFEST: &str = "pyproject.toml";
pub const DEFAULT_PAYLOAD: &str = "app.py";
pub const DEFAULT_PROBE_MODULE: &str = "urllib3";
pub const DEFAULT_EXTRACT_NAMESPACE: &str = "bootlaunch-tools";

pub const DEFAULT_VERSION_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CREATE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 60;

/// Which provisioning tool the bootstrapper may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolPreference {
    /// Fast tool when resolvable, standard toolchain otherwise.
    #[default]
    Auto,
    /// Fast tool must resolve; failing that is fatal.
    RequireFast,
    /// Never resolve the fast tool.
    StandardOnly,
}

impl ToolPreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "fast" | "uv" => Some(Self::RequireFast),
            "standard" | "venv" | "pip" => Some(Self::StandardOnly),
            _ => None,
        }
    }
}

/// 子进程超时配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// `<tool> --version`
    pub version: Duration,
    /// Verification probe inside the environment
    pub probe: Duration,
    pub create: Duration,
    /// Network-bound dependency install
    pub install: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            version: Duration::from_secs(DEFAULT_VERSION_TIMEOUT_SECS),
            probe: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            create: Duration::from_secs(DEFAULT_CREATE_TIMEOUT_SECS),
            install: Duration::from_secs(DEFAULT_INSTALL_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_source(source: &ConfigSource) -> Self {
        let secs = |key: &str, default: u64| {
            // A zero bound would fail every command; treat it as "use default".
            let v = source.env_u64(key, &[], default);
            Duration::from_secs(if v == 0 { default } else { v })
        };
        Self {
            version: secs(
                timeouts::BOOTLAUNCH_VERSION_TIMEOUT_SECS,
                DEFAULT_VERSION_TIMEOUT_SECS,
            ),
            probe: secs(
                timeouts::BOOTLAUNCH_PROBE_TIMEOUT_SECS,
                DEFAULT_PROBE_TIMEOUT_SECS,
            ),
            create: secs(
                timeouts::BOOTLAUNCH_CREATE_TIMEOUT_SECS,
                DEFAULT_CREATE_TIMEOUT_SECS,
            ),
            install: secs(
                timeouts::BOOTLAUNCH_INSTALL_TIMEOUT_SECS,
                DEFAULT_INSTALL_TIMEOUT_SECS,
            ),
        }
    }
}

/// 可观测性配置：quiet、log_level、log_json
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_source(source: &ConfigSource) -> Self {
        Self {
            quiet: source.env_bool(obv_keys::BOOTLAUNCH_QUIET, &[], false),
            log_level: source.env_or(obv_keys::BOOTLAUNCH_LOG_LEVEL, &[], || {
                "bootlaunch=info".to_string()
            }),
            log_json: source.env_bool(obv_keys::BOOTLAUNCH_LOG_JSON, &[], false),
        }
    }
}

/// 启动器配置（所有组件只读取这个值）
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub base_dir_override: Option<PathBuf>,
    pub bundle_dir: Option<PathBuf>,
    pub env_dir_name: String,
    pub manifest_name: String,
    pub payload_name: String,
    /// Module the probe imports; empty means "interpreter starts" is enough.
    pub probe_module: String,
    pub tool: ToolPreference,
    pub python: Option<PathBuf>,
    pub extract_dir: Option<PathBuf>,
    pub timeouts: TimeoutConfig,
    pub observability: ObservabilityConfig,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self::from_source(&ConfigSource::default())
    }
}

impl LauncherConfig {
    pub fn from_source(source: &ConfigSource) -> Self {
        let env_dir_name = source
            .env_optional(paths::BOOTLAUNCH_ENV_DIR_NAME, paths::ENV_DIR_NAME_ALIASES)
            .filter(|name| {
                let ok = is_single_component(name);
                if !ok {
                    tracing::warn!(
                        "Ignoring {}={:?}: must be a single directory name, using {}",
                        paths::BOOTLAUNCH_ENV_DIR_NAME,
                        name,
                        DEFAULT_ENV_DIR_NAME
                    );
                }
                ok
            })
            .unwrap_or_else(|| DEFAULT_ENV_DIR_NAME.to_string());

        let tool = match source.env_optional(tools::BOOTLAUNCH_TOOL, &[]) {
            Some(raw) => ToolPreference::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("Invalid {}: {:?}, using auto", tools::BOOTLAUNCH_TOOL, raw);
                ToolPreference::Auto
            }),
            None => ToolPreference::Auto,
        };

        Self {
            base_dir_override: source
                .env_optional(paths::BOOTLAUNCH_BASE_DIR, &[])
                .map(PathBuf::from),
            bundle_dir: source
                .env_optional(paths::BOOTLAUNCH_BUNDLE_DIR, &[])
                .map(PathBuf::from),
            env_dir_name,
            manifest_name: source.env_or(payload::BOOTLAUNCH_MANIFEST, &[], || {
                DEFAULT_MANIFEST.to_string()
            }),
            payload_name: source.env_or(payload::BOOTLAUNCH_PAYLOAD, &[], || {
                DEFAULT_PAYLOAD.to_string()
            }),
            probe_module: source
                .get(payload::BOOTLAUNCH_PROBE_MODULE)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_PROBE_MODULE.to_string()),
            tool,
            python: source
                .env_optional(tools::BOOTLAUNCH_PYTHON, &[])
                .map(PathBuf::from),
            extract_dir: source
                .env_optional(paths::BOOTLAUNCH_EXTRACT_DIR, &[])
                .map(PathBuf::from),
            timeouts: TimeoutConfig::from_source(source),
            observability: ObservabilityConfig::from_source(source),
        }
    }

    /// Temp directory receiving extracted tools: override, else `<temp>/bootlaunch-tools`.
    pub fn extract_dir(&self) -> PathBuf {
        self.extract_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_EXTRACT_NAMESPACE))
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
