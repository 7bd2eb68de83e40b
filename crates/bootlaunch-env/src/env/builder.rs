//! Ensure the isolated environment exists and is usable, provisioning it on
//! first run.
//!
//! State machine: Check → Provision (resolve tool) → CreateEnvironment
//! (fast tool, then standard toolchain once) → InstallDependencies →
//! Verified, with Degraded as the terminal state for every unrecovered
//! failure. Only a required-but-missing fast tool is returned as an error.
//! Without a dependency manifest nothing is provisioned: the run is degraded
//! and the payload gets the ambient interpreter.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bootlaunch_core::config::{LauncherConfig, ToolPreference};
use bootlaunch_core::context::ExecutionContext;
use bootlaunch_core::error::LaunchError;

use crate::process::{CommandSpec, ProcessRunner, RunOutcome};
use crate::toolchain::{self, ToolAvailability, ToolLocator, PROBE_SENTINEL};

/// Provisioning state of the environment directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentState {
    /// Directory does not exist.
    Absent,
    /// Directory exists but the probe has not passed.
    PresentUnverified,
    /// Probe passed; handoff uses the environment's interpreter only.
    Verified,
    /// Provisioning could not complete; handoff uses the best interpreter available.
    Degraded,
}

/// Outcome of one provisioning command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningResult {
    Success,
    ToolUnavailable { reason: String },
    CommandFailed { code: Option<i32>, output: String },
    TimedOut { after: Duration, output: String },
}

impl ProvisioningResult {
    pub fn from_outcome(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Exited { code: Some(0), .. } => Self::Success,
            RunOutcome::Exited { code, output } => Self::CommandFailed { code, output },
            RunOutcome::TimedOut { after, output } => Self::TimedOut { after, output },
            RunOutcome::SpawnFailed {
                not_found: true,
                message,
            } => Self::ToolUnavailable { reason: message },
            RunOutcome::SpawnFailed { message, .. } => Self::CommandFailed {
                code: None,
                output: message,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Captured output worth showing after a failure.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. } | Self::TimedOut { output, .. } => {
                Some(output.as_str()).filter(|o| !o.trim().is_empty())
            }
            _ => None,
        }
    }
}

impl fmt::Display for ProvisioningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::ToolUnavailable { reason } => write!(f, "tool unavailable: {}", reason),
            Self::CommandFailed { code: Some(code), .. } => write!(f, "exit code {}", code),
            Self::CommandFailed { code: None, .. } => f.write_str("terminated without exit code"),
            Self::TimedOut { after, .. } => write!(f, "timed out after {:.1}s", after.as_secs_f64()),
        }
    }
}

/// Drives one bootstrap attempt for one [`ExecutionContext`].
pub struct Bootstrapper<'a, R, L> {
    ctx: &'a ExecutionContext,
    cfg: &'a LauncherConfig,
    runner: R,
    locator: L,
    embedded_fast_tool: Option<PathBuf>,
}

impl<'a, R: ProcessRunner, L: ToolLocator> Bootstrapper<'a, R, L> {
    pub fn new(ctx: &'a ExecutionContext, cfg: &'a LauncherConfig, runner: R, locator: L) -> Self {
        Self {
            ctx,
            cfg,
            runner,
            locator,
            embedded_fast_tool: None,
        }
    }

    /// Fast tool extracted from the bundle; tried before the search path.
    pub fn with_embedded_fast_tool(mut self, path: Option<PathBuf>) -> Self {
        self.embedded_fast_tool = path;
        self
    }

    /// Run the state machine. Returns `Verified` or `Degraded`.
    pub fn ensure(&self) -> Result<EnvironmentState, LaunchError> {
        if self.check() == EnvironmentState::Verified {
            tracing::info!("Virtual environment already set up");
            return Ok(EnvironmentState::Verified);
        }

        let Some(ref manifest) = self.ctx.manifest_path else {
            tracing::info!(
                "{} not found, running without virtual environment setup",
                self.cfg.manifest_name
            );
            return Ok(EnvironmentState::Degraded);
        };

        tracing::info!("Setting up virtual environment at {}", self.ctx.env_dir.display());
        let tool = self.resolve_tool()?;
        let ambient = self.ambient_interpreter();

        let Some(tool) = self.create_environment(tool, ambient.as_deref()) else {
            tracing::warn!("Could not create a virtual environment; continuing in degraded mode");
            return Ok(EnvironmentState::Degraded);
        };

        if !self.install_dependencies(&tool, manifest).is_success() {
            tracing::warn!("Dependency install failed; continuing in degraded mode");
            return Ok(EnvironmentState::Degraded);
        }

        if self.probe() {
            tracing::info!("Environment setup complete");
            Ok(EnvironmentState::Verified)
        } else {
            tracing::warn!(
                "Environment at {} did not pass verification; continuing in degraded mode",
                self.ctx.env_dir.display()
            );
            Ok(EnvironmentState::Degraded)
        }
    }

    /// Existence check plus verification probe. Never provisions.
    pub fn check(&self) -> EnvironmentState {
        if !self.ctx.env_dir.is_dir() {
            return EnvironmentState::Absent;
        }
        if self.probe() {
            EnvironmentState::Verified
        } else {
            EnvironmentState::PresentUnverified
        }
    }

    /// Run the probe inside the environment; true when it exits 0 and prints the sentinel.
    pub fn probe(&self) -> bool {
        let spec = toolchain::probe_command(self.ctx, &self.cfg.probe_module);
        let outcome = self.runner.run(&spec, self.cfg.timeouts.probe);
        let ok = outcome.success()
            && outcome
                .output()
                .lines()
                .any(|line| line.trim() == PROBE_SENTINEL);
        if !ok {
            tracing::debug!(
                "Verification probe failed: {} -> {}",
                spec,
                ProvisioningResult::from_outcome(outcome)
            );
        }
        ok
    }

    /// Pick the provisioning strategy: embedded fast tool, then the search
    /// path, each confirmed with a bounded `--version`; else standard tools.
    pub fn resolve_tool(&self) -> Result<ToolAvailability, LaunchError> {
        if self.cfg.tool == ToolPreference::StandardOnly {
            tracing::info!("Fast tool disabled, using standard tools");
            return Ok(ToolAvailability::StandardToolchain);
        }

        let name = self.ctx.layout.fast_tool;
        let mut rejected = Vec::new();

        let mut candidates: Vec<PathBuf> = self.embedded_fast_tool.iter().cloned().collect();
        if let Some(on_path) = self.locator.find(name) {
            if !candidates.contains(&on_path) {
                candidates.push(on_path);
            }
        }

        for candidate in candidates {
            let outcome = self
                .runner
                .run(&toolchain::version_query(&candidate), self.cfg.timeouts.version);
            if outcome.success() {
                tracing::info!("Found uv package manager: {}", outcome.output().trim());
                return Ok(ToolAvailability::FastTool { path: candidate });
            }
            rejected.push(format!(
                "{}: {}",
                candidate.display(),
                ProvisioningResult::from_outcome(outcome)
            ));
        }

        let reason = if rejected.is_empty() {
            format!("{} is not bundled and not on PATH", name)
        } else {
            rejected.join("; ")
        };

        if self.cfg.tool == ToolPreference::RequireFast {
            return Err(LaunchError::FastToolRequired { reason });
        }
        tracing::warn!("uv not found ({}), using standard tools", reason);
        Ok(ToolAvailability::StandardToolchain)
    }

    /// Ambient interpreter for the standard toolchain and degraded handoff.
    pub fn ambient_interpreter(&self) -> Option<PathBuf> {
        toolchain::find_ambient_interpreter(self.ctx, self.cfg.python.as_deref(), &self.locator)
    }

    /// Create the environment, demoting the fast tool to the standard
    /// toolchain exactly once. Returns the strategy that succeeded.
    fn create_environment(
        &self,
        tool: ToolAvailability,
        ambient: Option<&Path>,
    ) -> Option<ToolAvailability> {
        if self.run_create(&tool, ambient).is_success() {
            tracing::info!("Created virtual environment with {}", tool.label());
            return Some(tool);
        }
        if !tool.is_fast() {
            return None;
        }

        tracing::info!("Retrying environment creation with standard tools");
        let fallback = ToolAvailability::StandardToolchain;
        if self.run_create(&fallback, ambient).is_success() {
            tracing::info!("Created virtual environment with {}", fallback.label());
            Some(fallback)
        } else {
            None
        }
    }

    fn run_create(&self, tool: &ToolAvailability, ambient: Option<&Path>) -> ProvisioningResult {
        let clear = self.ctx.env_dir.exists();
        match toolchain::create_command(tool, self.ctx, ambient, clear) {
            Some(spec) => self.run_step(&spec, self.cfg.timeouts.create),
            None => {
                let result = ProvisioningResult::ToolUnavailable {
                    reason: format!(
                        "no Python interpreter found (tried: {})",
                        self.ctx.layout.ambient_interpreters.join(", ")
                    ),
                };
                tracing::warn!("Environment creation with {} failed: {}", tool.label(), result);
                result
            }
        }
    }

    fn install_dependencies(&self, tool: &ToolAvailability, manifest: &Path) -> ProvisioningResult {
        tracing::info!("Installing dependencies from {}...", manifest.display());
        let spec = toolchain::install_command(tool, self.ctx, manifest);
        let result = self.run_step(&spec, self.cfg.timeouts.install);
        if result.is_success() {
            tracing::info!("Dependencies installed");
        }
        result
    }

    /// Run one provisioning command. Output is only shown on failure.
    fn run_step(&self, spec: &CommandSpec, timeout: Duration) -> ProvisioningResult {
        let result = ProvisioningResult::from_outcome(self.runner.run(spec, timeout));
        if !result.is_success() {
            tracing::warn!("{} failed ({}): {}", spec.purpose, result, spec);
            if let Some(output) = result.output() {
                tracing::warn!("{}", output.trim_end());
            }
        }
        result
    }
}
