//! Copy bundled assets (fast tool binary, dependency manifest) out of the
//! packaged launcher into a stable temp location.
//!
//! Copies are size-checked: an existing destination with the same byte size
//! as the source is reused, anything else is overwritten. Nothing under the
//! base directory is touched.

use std::fs;
use std::path::{Path, PathBuf};

use bootlaunch_core::config::LauncherConfig;
use bootlaunch_core::context::ExecutionContext;
use bootlaunch_core::error::ExtractError;

/// Result of one [`ResourceExtractor::extract`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedResource {
    pub path: PathBuf,
    /// False when an up-to-date copy was already in place.
    pub copied: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceExtractor {
    /// Searched in order: bundle root first, then the executable's directory.
    roots: Vec<PathBuf>,
    dest_dir: PathBuf,
}

impl ResourceExtractor {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            roots: Vec::new(),
            dest_dir: dest_dir.into(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Extractor for this run: bundle root, then the executable's siblings,
    /// copied into `subdir` of the configured extraction directory.
    pub fn for_context(ctx: &ExecutionContext, cfg: &LauncherConfig, subdir: &str) -> Self {
        let mut extractor = Self::new(cfg.extract_dir().join(subdir));
        if let Some(ref bundle) = ctx.bundle_dir {
            extractor = extractor.with_root(bundle);
        }
        if let Some(ref exe_dir) = ctx.exe_dir {
            extractor = extractor.with_root(exe_dir);
        }
        extractor
    }

    /// First root that holds `name` as a regular file.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|p| p.is_file())
    }

    /// Extract a data file.
    pub fn extract(&self, name: &str) -> Result<ExtractedResource, ExtractError> {
        self.extract_inner(name, false)
    }

    /// Extract a binary and mark it executable on Unix.
    pub fn extract_executable(&self, name: &str) -> Result<ExtractedResource, ExtractError> {
        self.extract_inner(name, true)
    }

    fn extract_inner(&self, name: &str, executable: bool) -> Result<ExtractedResource, ExtractError> {
        let source = self.locate(name).ok_or_else(|| ExtractError::ResourceMissing {
            name: name.to_string(),
            searched: self
                .roots
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })?;
        let dest = self.dest_dir.join(name);
        let copy_failed = |source_err| ExtractError::CopyFailed {
            from: source.clone(),
            to: dest.clone(),
            source: source_err,
        };

        let up_to_date = match (fs::metadata(&source), fs::metadata(&dest)) {
            (Ok(src), Ok(dst)) => dst.is_file() && src.len() == dst.len(),
            (Err(e), _) => return Err(copy_failed(e)),
            _ => false,
        };

        if up_to_date {
            if executable {
                set_executable(&dest).map_err(copy_failed)?;
            }
            tracing::debug!("{} already extracted at {}", name, dest.display());
            return Ok(ExtractedResource {
                path: dest,
                copied: false,
            });
        }

        tracing::info!("Extracting {}...", name);
        fs::create_dir_all(&self.dest_dir).map_err(copy_failed)?;

        // Copy under a process-unique name, then rename into place so a
        // concurrent launcher never runs a half-written binary.
        let staging = self
            .dest_dir
            .join(format!(".{}.{}.partial", name, std::process::id()));
        let staged = fs::copy(&source, &staging)
            .and_then(|_| if executable { set_executable(&staging) } else { Ok(()) })
            .and_then(|_| fs::rename(&staging, &dest));
        if let Err(e) = staged {
            let _ = fs::remove_file(&staging);
            return Err(copy_failed(e));
        }

        Ok(ExtractedResource {
            path: dest,
            copied: true,
        })
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    if perms.mode() & 0o111 != 0o111 {
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("bundle");
        let dest = tmp.path().join("extract");
        fs::create_dir_all(&bundle).unwrap();
        (tmp, bundle, dest)
    }

    #[test]
    fn test_extract_twice_copies_once() {
        let (_tmp, bundle, dest) = setup();
        fs::write(bundle.join("uv"), b"#!/bin/sh\necho uv 0.4.0\n").unwrap();
        let extractor = ResourceExtractor::new(&dest).with_root(&bundle);

        let first = extractor.extract_executable("uv").unwrap();
        assert!(first.copied);
        let second = extractor.extract_executable("uv").unwrap();
        assert!(!second.copied);
        assert_eq!(first.path, second.path);
        assert_eq!(
            fs::read(&second.path).unwrap(),
            fs::read(bundle.join("uv")).unwrap()
        );
        // No staging files left behind
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 1);
    }

    #[test]
    fn test_changed_size_is_recopied() {
        let (_tmp, bundle, dest) = setup();
        fs::write(bundle.join("pyproject.toml"), "[project]\n").unwrap();
        let extractor = ResourceExtractor::new(&dest).with_root(&bundle);
        extractor.extract("pyproject.toml").unwrap();

        fs::write(bundle.join("pyproject.toml"), "[project]\nname = \"app\"\n").unwrap();
        let again = extractor.extract("pyproject.toml").unwrap();
        assert!(again.copied);
        assert_eq!(
            fs::read_to_string(&again.path).unwrap(),
            "[project]\nname = \"app\"\n"
        );
    }

    #[test]
    fn test_missing_resource_is_a_value() {
        let (_tmp, bundle, dest) = setup();
        let extractor = ResourceExtractor::new(&dest).with_root(&bundle);
        match extractor.extract("uv") {
            Err(ExtractError::ResourceMissing { name, searched }) => {
                assert_eq!(name, "uv");
                assert!(searched.contains("bundle"));
            }
            other => panic!("expected ResourceMissing, got {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[test]
    fn test_roots_searched_in_order() {
        let (tmp, bundle, dest) = setup();
        let exe_dir = tmp.path().join("dist");
        fs::create_dir_all(&exe_dir).unwrap();
        fs::write(exe_dir.join("uv"), "sibling").unwrap();
        let extractor = ResourceExtractor::new(&dest)
            .with_root(&bundle)
            .with_root(&exe_dir);
        assert_eq!(extractor.locate("uv"), Some(exe_dir.join("uv")));

        fs::write(bundle.join("uv"), "bundled").unwrap();
        assert_eq!(extractor.locate("uv"), Some(bundle.join("uv")));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_bit_is_set() {
        use std::os::unix::fs::PermissionsExt;
        let (_tmp, bundle, dest) = setup();
        fs::write(bundle.join("uv"), "bin").unwrap();
        let extracted = ResourceExtractor::new(&dest)
            .with_root(&bundle)
            .extract_executable("uv")
            .unwrap();
        let mode = fs::metadata(&extracted.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
