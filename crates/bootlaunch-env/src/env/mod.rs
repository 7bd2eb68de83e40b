//! Isolated environment bootstrapper.
//!
//! Decides whether provisioning is needed, picks the fast tool or the
//! standard toolchain, creates the environment and installs dependencies,
//! then verifies it. Callers receive only an [`builder::EnvironmentState`].

pub mod builder;
