//! Payload handoff: locate the payload, run it once with the launcher's own
//! arguments, and report its exit code.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use bootlaunch_core::context::ExecutionContext;
use bootlaunch_core::error::LaunchError;

/// `base_dir/<name>` first, then the bundle root.
pub fn locate_payload(ctx: &ExecutionContext, name: &str) -> Result<PathBuf, LaunchError> {
    let mut searched = vec![ctx.base_dir.join(name)];
    if let Some(ref bundle) = ctx.bundle_dir {
        searched.push(bundle.join(name));
    }
    if let Some(found) = searched.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }
    Err(LaunchError::PayloadNotFound {
        name: name.to_string(),
        searched: searched
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Run `<interpreter> <payload> <args...>` with inherited stdio and working
/// directory. Returns the payload's exit code.
pub fn run_payload(interpreter: &Path, payload: &Path, args: &[OsString]) -> Result<i32, LaunchError> {
    tracing::info!("Starting application...");
    tracing::debug!("Handoff: {} {} ({} args)", interpreter.display(), payload.display(), args.len());
    let status = Command::new(interpreter)
        .arg(payload)
        .args(args)
        .status()
        .map_err(|source| LaunchError::Spawn {
            program: interpreter.to_path_buf(),
            source,
        })?;
    Ok(exit_code(status))
}

/// Exit code to propagate. A signal-terminated payload maps to `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
