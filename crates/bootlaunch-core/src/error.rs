//! Error taxonomy shared by the extractor, the bootstrapper and the launcher.
//!
//! Provisioning failures are not errors here: they are
//! `ProvisioningResult` values that the state machine recovers from.
//! Only the variants below ever leave a component as `Err`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by bundled-resource extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Bundled resource '{name}' not found (searched: {searched})")]
    ResourceMissing { name: String, searched: String },

    #[error("Failed to copy '{}' to '{}': {source}", from.display(), to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that stop the launcher before or at payload handoff.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Payload '{name}' not found (searched: {searched})")]
    PayloadNotFound { name: String, searched: String },

    #[error("No interpreter available to run the payload (tried: {tried})")]
    InterpreterNotFound { tried: String },

    #[error("Fast provisioning tool is required but could not be resolved: {reason}")]
    FastToolRequired { reason: String },

    #[error("Failed to start payload '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
