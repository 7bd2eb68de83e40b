//! Provisioning tool strategies and the command lines they run.
//!
//! The fast tool (`uv`) is preferred whenever it resolves; the standard
//! toolchain (`python -m venv` + `pip`) is the portable fallback.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use bootlaunch_core::context::ExecutionContext;

use crate::process::{CommandSpec, Purpose};

/// Printed by the verification probe when the environment is usable.
pub const PROBE_SENTINEL: &str = "venv OK";

/// Which provisioning tool this attempt uses. Re-derived on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAvailability {
    FastTool { path: PathBuf },
    StandardToolchain,
}

impl ToolAvailability {
    pub fn is_fast(&self) -> bool {
        matches!(self, Self::FastTool { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FastTool { .. } => "uv",
            Self::StandardToolchain => "venv/pip",
        }
    }
}

/// Looks up executables by name.
pub trait ToolLocator {
    fn find(&self, name: &str) -> Option<PathBuf>;
}

/// `PATH` lookup via `which`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchPath;

impl ToolLocator for SearchPath {
    fn find(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

impl<L: ToolLocator + ?Sized> ToolLocator for &L {
    fn find(&self, name: &str) -> Option<PathBuf> {
        (**self).find(name)
    }
}

/// Resolve the ambient interpreter: explicit override first, then the
/// platform's candidate names on the search path.
pub fn find_ambient_interpreter(
    ctx: &ExecutionContext,
    explicit: Option<&Path>,
    locator: &dyn ToolLocator,
) -> Option<PathBuf> {
    if let Some(python) = explicit {
        if python.components().count() > 1 {
            return Some(python.to_path_buf()).filter(|p| p.exists());
        }
        return locator.find(&python.to_string_lossy());
    }
    ctx.layout
        .ambient_interpreters
        .iter()
        .find_map(|name| locator.find(name))
}

pub fn version_query(tool: &Path) -> CommandSpec {
    CommandSpec::new(Purpose::VersionQuery, tool).arg("--version")
}

/// `<env-python> -c "import <module>; print('venv OK')"`
pub fn probe_command(ctx: &ExecutionContext, probe_module: &str) -> CommandSpec {
    let script = if is_module_name(probe_module) {
        format!("import {}; print('{}')", probe_module, PROBE_SENTINEL)
    } else {
        if !probe_module.is_empty() {
            tracing::warn!("Ignoring invalid probe module name {:?}", probe_module);
        }
        format!("print('{}')", PROBE_SENTINEL)
    };
    CommandSpec::new(Purpose::Probe, ctx.env_interpreter())
        .arg("-c")
        .arg(script)
        .current_dir(&ctx.base_dir)
}

/// Environment creation for the given strategy.
///
/// Returns `None` for the standard toolchain when no ambient interpreter is
/// available. `clear` replaces an existing, unverified environment.
pub fn create_command(
    tool: &ToolAvailability,
    ctx: &ExecutionContext,
    ambient: Option<&Path>,
    clear: bool,
) -> Option<CommandSpec> {
    let spec = match tool {
        ToolAvailability::FastTool { path } => CommandSpec::new(Purpose::CreateEnvironment, path)
            .arg("venv")
            .arg(&ctx.env_dir),
        ToolAvailability::StandardToolchain => {
            let mut spec = CommandSpec::new(Purpose::CreateEnvironment, ambient?)
                .arg("-m")
                .arg("venv");
            if clear {
                spec = spec.arg("--clear");
            }
            spec.arg(&ctx.env_dir)
        }
    };
    Some(spec.current_dir(&ctx.base_dir))
}

/// Dependency install for the given strategy. Both strategies install the
/// same target; see [`install_target`].
pub fn install_command(tool: &ToolAvailability, ctx: &ExecutionContext, manifest: &Path) -> CommandSpec {
    let python = ctx.env_interpreter();
    let spec = match tool {
        ToolAvailability::FastTool { path } => CommandSpec::new(Purpose::InstallDependencies, path)
            .arg("pip")
            .arg("install")
            .arg("--python")
            .arg(&python),
        ToolAvailability::StandardToolchain => CommandSpec::new(Purpose::InstallDependencies, &python)
            .arg("-m")
            .arg("pip")
            .arg("install"),
    };
    install_target(manifest)
        .into_iter()
        .fold(spec, |spec, arg| spec.arg(arg))
        .current_dir(&ctx.base_dir)
}

/// The manifest is passed through untouched; only its file extension
/// matters. A `.toml` project manifest installs its directory in editable
/// mode, anything else is read as a requirements list.
fn install_target(manifest: &Path) -> Vec<OsString> {
    let is_project = manifest
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));
    if !is_project {
        return vec!["-r".into(), manifest.as_os_str().to_os_string()];
    }
    let dir = match manifest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.as_os_str().to_os_string(),
        _ => ".".into(),
    };
    vec!["-e".into(), dir]
}

fn is_module_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootlaunch_core::config::{ConfigSource, LauncherConfig};
    use bootlaunch_core::context::PlatformLayout;
    use std::collections::HashMap;

    fn os(s: &str) -> OsString {
        OsString::from(s)
    }

    struct FakeLocator(HashMap<&'static str, PathBuf>);

    impl ToolLocator for FakeLocator {
        fn find(&self, name: &str) -> Option<PathBuf> {
            self.0.get(name).cloned()
        }
    }

    fn ctx(base: &Path) -> ExecutionContext {
        let cfg = LauncherConfig::from_source(&ConfigSource::from_pairs(Vec::<(String, String)>::new()));
        ExecutionContext::resolve(&cfg, PlatformLayout::unix(), None, base)
    }

    #[test]
    fn test_probe_command_imports_module() {
        let base = Path::new("/srv/app");
        let spec = probe_command(&ctx(base), "urllib3");
        assert_eq!(spec.program, base.join(".venv").join("bin").join("python"));
        assert_eq!(
            spec.args,
            vec![os("-c"), os("import urllib3; print('venv OK')")]
        );

        let spec = probe_command(&ctx(base), "os; import shutil");
        assert_eq!(spec.args[1], os("print('venv OK')"));
        assert!(is_module_name("google.protobuf"));
        assert!(!is_module_name("1abc"));
    }

    #[test]
    fn test_create_commands() {
        let base = Path::new("/srv/app");
        let c = ctx(base);
        let fast = ToolAvailability::FastTool {
            path: PathBuf::from("/tmp/bootlaunch-tools/uv"),
        };
        let spec = create_command(&fast, &c, None, true).unwrap();
        assert_eq!(spec.args, vec![os("venv"), base.join(".venv").into_os_string()]);
        assert_eq!(spec.cwd.as_deref(), Some(base));

        let py = PathBuf::from("/usr/bin/python3");
        let spec = create_command(&ToolAvailability::StandardToolchain, &c, Some(&py), true).unwrap();
        assert_eq!(spec.program, py);
        assert_eq!(
            spec.args,
            vec![os("-m"), os("venv"), os("--clear"), base.join(".venv").into_os_string()]
        );

        assert!(create_command(&ToolAvailability::StandardToolchain, &c, None, false).is_none());
    }

    #[test]
    fn test_install_commands() {
        let base = Path::new("/srv/app");
        let c = ctx(base);
        let python = base.join(".venv").join("bin").join("python");

        let fast = ToolAvailability::FastTool { path: PathBuf::from("uv") };
        let manifest = base.join("pyproject.toml");
        let spec = install_command(&fast, &c, &manifest);
        assert_eq!(
            spec.args,
            vec![
                os("pip"),
                os("install"),
                os("--python"),
                python.clone().into_os_string(),
                os("-e"),
                base.as_os_str().to_os_string(),
            ]
        );

        let spec = install_command(&ToolAvailability::StandardToolchain, &c, &manifest);
        assert_eq!(spec.program, python);
        assert_eq!(
            spec.args,
            vec![os("-m"), os("pip"), os("install"), os("-e"), base.as_os_str().to_os_string()]
        );

        let reqs = base.join("requirements.txt");
        let spec = install_command(&ToolAvailability::StandardToolchain, &c, &reqs);
        assert_eq!(
            spec.args,
            vec![os("-m"), os("pip"), os("install"), os("-r"), reqs.clone().into_os_string()]
        );
    }

    #[test]
    fn test_both_strategies_install_the_same_target() {
        let base = Path::new("/srv/app");
        let c = ctx(base);
        let fast = ToolAvailability::FastTool { path: PathBuf::from("uv") };

        for manifest in [
            base.join("pyproject.toml"),
            PathBuf::from("/tmp/bootlaunch-tools/project/pyproject.toml"),
            base.join("requirements.txt"),
            PathBuf::from("pyproject.toml"),
        ] {
            let uv = install_command(&fast, &c, &manifest);
            let pip = install_command(&ToolAvailability::StandardToolchain, &c, &manifest);
            assert_eq!(uv.args[uv.args.len() - 2..], pip.args[pip.args.len() - 2..]);
        }
        assert_eq!(install_target(Path::new("pyproject.toml")), vec![os("-e"), os(".")]);
    }

    #[test]
    fn test_ambient_interpreter_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ctx(tmp.path());
        let locator = FakeLocator(HashMap::from([("python", PathBuf::from("/usr/bin/python"))]));
        assert_eq!(
            find_ambient_interpreter(&c, None, &locator),
            Some(PathBuf::from("/usr/bin/python"))
        );
        assert_eq!(find_ambient_interpreter(&c, Some(Path::new("python3.12")), &locator), None);

        let explicit = tmp.path().join("python3");
        std::fs::write(&explicit, "").unwrap();
        assert_eq!(
            find_ambient_interpreter(&c, Some(&explicit), &locator),
            Some(explicit.clone())
        );
        assert_eq!(
            find_ambient_interpreter(&c, Some(&tmp.path().join("missing")), &locator),
            None
        );
    }
}
