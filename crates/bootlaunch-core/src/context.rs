//! Execution context and host platform layout.
//!
//! [`ExecutionContext`] is computed once at startup and threaded through every
//! component; nothing downstream looks at the working directory or the
//! executable path on its own.

use std::path::{Path, PathBuf};

use crate::config::LauncherConfig;

/// Directory that marks a packaged launcher when it sits beside the executable.
pub const BUNDLE_DIR_NAME: &str = "_bundle";

/// Per-platform executable names and relative layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformLayout {
    /// File name of the fast provisioning tool.
    pub fast_tool: &'static str,
    /// Interpreter path relative to an environment directory.
    pub env_interpreter: &'static [&'static str],
    /// Ambient interpreters, tried in order.
    pub ambient_interpreters: &'static [&'static str],
}

impl PlatformLayout {
    /// Layout for the platform this binary was compiled for.
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self::unix()
        }
    }

    pub const fn unix() -> Self {
        Self {
            fast_tool: "uv",
            env_interpreter: &["bin", "python"],
            ambient_interpreters: &["python3", "python"],
        }
    }

    pub const fn windows() -> Self {
        Self {
            fast_tool: "uv.exe",
            env_interpreter: &["Scripts", "python.exe"],
            ambient_interpreters: &["python", "py"],
        }
    }

    /// Interpreter inside the given environment directory.
    pub fn interpreter_in(&self, env_dir: &Path) -> PathBuf {
        self.env_interpreter
            .iter()
            .fold(env_dir.to_path_buf(), |p, part| p.join(part))
    }
}

/// Immutable per-run facts about where the launcher lives.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Anchor for every relative lookup.
    pub base_dir: PathBuf,
    pub is_packaged: bool,
    /// Always `base_dir/<name>`.
    pub env_dir: PathBuf,
    /// Dependency manifest, if one was found.
    pub manifest_path: Option<PathBuf>,
    /// Embedded bundle root, when packaged.
    pub bundle_dir: Option<PathBuf>,
    /// Directory holding the launcher executable.
    pub exe_dir: Option<PathBuf>,
    pub layout: PlatformLayout,
}

impl ExecutionContext {
    /// Detect the context from the running process.
    pub fn detect(cfg: &LauncherConfig) -> std::io::Result<Self> {
        let exe = std::env::current_exe().ok();
        let cwd = std::env::current_dir()?;
        Ok(Self::resolve(cfg, PlatformLayout::host(), exe.as_deref(), &cwd))
    }

    /// Pure resolution step behind [`ExecutionContext::detect`].
    ///
    /// `base_dir` is the configured override, else the executable's directory
    /// when packaged, else `cwd` (running from a source checkout).
    pub fn resolve(
        cfg: &LauncherConfig,
        layout: PlatformLayout,
        exe: Option<&Path>,
        cwd: &Path,
    ) -> Self {
        let exe_dir = exe
            .and_then(|e| e.parent())
            .map(|d| absolutize(d, cwd));

        let bundle_dir = cfg
            .bundle_dir
            .as_ref()
            .map(|b| absolutize(b, cwd))
            .or_else(|| {
                exe_dir
                    .as_ref()
                    .map(|d| d.join(BUNDLE_DIR_NAME))
                    .filter(|b| b.is_dir())
            });
        let is_packaged = bundle_dir.is_some();

        let base_dir = match (&cfg.base_dir_override, &exe_dir) {
            (Some(dir), _) => absolutize(dir, cwd),
            (None, Some(dir)) if is_packaged => dir.clone(),
            _ => cwd.to_path_buf(),
        };

        let env_dir = base_dir.join(&cfg.env_dir_name);
        let manifest_path = Some(base_dir.join(&cfg.manifest_name)).filter(|p| p.is_file());

        Self {
            base_dir,
            is_packaged,
            env_dir,
            manifest_path,
            bundle_dir,
            exe_dir,
            layout,
        }
    }

    /// Attach a manifest located after detection (e.g. extracted from the bundle).
    pub fn with_manifest(mut self, manifest: Option<PathBuf>) -> Self {
        if manifest.is_some() {
            self.manifest_path = manifest;
        }
        self
    }

    /// Interpreter inside the isolated environment.
    pub fn env_interpreter(&self) -> PathBuf {
        self.layout.interpreter_in(&self.env_dir)
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSource;

    fn config(pairs: &[(&str, &str)]) -> LauncherConfig {
        LauncherConfig::from_source(&ConfigSource::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_source_checkout_uses_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        let cwd = tmp.path().join("project");
        std::fs::create_dir_all(&cwd).unwrap();
        let exe = tmp.path().join("target").join("bootlaunch");

        let ctx = ExecutionContext::resolve(&config(&[]), PlatformLayout::unix(), Some(&exe), &cwd);
        assert!(!ctx.is_packaged);
        assert_eq!(ctx.base_dir, cwd);
        assert_eq!(ctx.env_dir, cwd.join(".venv"));
        assert!(ctx.manifest_path.is_none());
        assert!(ctx.env_dir.starts_with(&ctx.base_dir));
    }

    #[test]
    fn test_sibling_bundle_marks_packaged() {
        let tmp = tempfile::tempdir().unwrap();
        let dist = tmp.path().join("dist");
        std::fs::create_dir_all(dist.join(BUNDLE_DIR_NAME)).unwrap();
        std::fs::write(dist.join("pyproject.toml"), "[project]\n").unwrap();
        let exe = dist.join("bootlaunch");
        let cwd = tmp.path().join("elsewhere");

        let ctx = ExecutionContext::resolve(&config(&[]), PlatformLayout::unix(), Some(&exe), &cwd);
        assert!(ctx.is_packaged);
        assert_eq!(ctx.base_dir, dist);
        assert_eq!(ctx.bundle_dir, Some(dist.join(BUNDLE_DIR_NAME)));
        assert_eq!(ctx.manifest_path, Some(dist.join("pyproject.toml")));
    }

    #[test]
    fn test_overrides_are_resolved_against_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(&[
            ("BOOTLAUNCH_BASE_DIR", "app"),
            ("BOOTLAUNCH_BUNDLE_DIR", "bundle"),
            ("BOOTLAUNCH_ENV_DIR_NAME", "env"),
        ]);
        let ctx = ExecutionContext::resolve(&cfg, PlatformLayout::unix(), None, tmp.path());
        assert!(ctx.is_packaged);
        assert_eq!(ctx.base_dir, tmp.path().join("app"));
        assert_eq!(ctx.bundle_dir, Some(tmp.path().join("bundle")));
        assert_eq!(ctx.env_dir, tmp.path().join("app").join("env"));
    }

    #[test]
    fn test_with_manifest_keeps_existing_when_none() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("pyproject.toml"), "").unwrap();
        let ctx = ExecutionContext::resolve(&config(&[]), PlatformLayout::unix(), None, tmp.path());
        let ctx = ctx.with_manifest(None);
        assert_eq!(ctx.manifest_path, Some(tmp.path().join("pyproject.toml")));
    }

    #[test]
    fn test_platform_layouts() {
        let env = Path::new("base").join(".venv");
        assert_eq!(
            PlatformLayout::unix().interpreter_in(&env),
            env.join("bin").join("python")
        );
        assert_eq!(
            PlatformLayout::windows().interpreter_in(&env),
            env.join("Scripts").join("python.exe")
        );
        assert_eq!(PlatformLayout::windows().fast_tool, "uv.exe");
    }
}
