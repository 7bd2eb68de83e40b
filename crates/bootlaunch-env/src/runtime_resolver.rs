//! Choose the interpreter the payload is handed to.
//!
//! A verified environment is used exclusively. In degraded mode the
//! environment's interpreter is still preferred if it exists at all, then the
//! ambient one.

use std::path::{Path, PathBuf};

use bootlaunch_core::context::ExecutionContext;
use bootlaunch_core::error::LaunchError;

use crate::env::builder::EnvironmentState;

pub fn payload_interpreter(
    ctx: &ExecutionContext,
    state: EnvironmentState,
    ambient: Option<&Path>,
) -> Result<PathBuf, LaunchError> {
    let isolated = ctx.env_interpreter();
    if state == EnvironmentState::Verified || isolated.is_file() {
        return Ok(isolated);
    }
    if let Some(ambient) = ambient {
        tracing::warn!(
            "Running with ambient interpreter {} (no isolated environment)",
            ambient.display()
        );
        return Ok(ambient.to_path_buf());
    }
    Err(LaunchError::InterpreterNotFound {
        tried: std::iter::once(isolated.display().to_string())
            .chain(ctx.layout.ambient_interpreters.iter().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
    })
}
