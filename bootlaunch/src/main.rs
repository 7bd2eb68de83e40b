mod cli;
mod handoff;
mod observability;

use std::ffi::OsString;

use anyhow::{Context, Result};
use bootlaunch_core::config::{ConfigSource, LauncherConfig};
use bootlaunch_core::context::ExecutionContext;
use bootlaunch_core::error::ExtractError;
use bootlaunch_env::{Bootstrapper, ResourceExtractor, SearchPath, SystemRunner};
use cli::Cli;

/// Exit code when no payload could be started at all.
const EXIT_LAUNCH_FAILED: i32 = 1;

/// Extraction subdirectories under the temp namespace.
const TOOLS_SUBDIR: &str = "bin";
const MANIFEST_SUBDIR: &str = "project";

fn main() {
    let cli = Cli::from_argv(std::env::args_os());
    let code = match launch(cli.args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("bootlaunch: {:#}", e);
            EXIT_LAUNCH_FAILED
        }
    };
    std::process::exit(code);
}

fn launch(args: Vec<OsString>) -> Result<i32> {
    let (cfg, ctx) = load_context()?;
    observability::init_tracing(&cfg.observability);
    tracing::info!("=== Application Bootstrap ===");
    tracing::debug!(
        base_dir = %ctx.base_dir.display(),
        packaged = ctx.is_packaged,
        "Execution context"
    );

    let (ctx, embedded_tool) = extract_bundled(&ctx, &cfg);

    let bootstrapper = Bootstrapper::new(&ctx, &cfg, SystemRunner, SearchPath)
        .with_embedded_fast_tool(embedded_tool);
    let state = bootstrapper.ensure()?;

    let payload = handoff::locate_payload(&ctx, &cfg.payload_name)?;
    let ambient = bootstrapper.ambient_interpreter();
    let interpreter =
        bootlaunch_env::runtime_resolver::payload_interpreter(&ctx, state, ambient.as_deref())?;

    Ok(handoff::run_payload(&interpreter, &payload, &args)?)
}

/// Build config and context. `.env` lives in the base directory, so the
/// context is resolved once from the process environment, then again with
/// the `.env` layer applied.
fn load_context() -> Result<(LauncherConfig, ExecutionContext)> {
    let source = ConfigSource::from_process();
    let initial = LauncherConfig::from_source(&source);
    let probe_ctx =
        ExecutionContext::detect(&initial).context("Failed to determine the base directory")?;

    let source = source.with_dotenv_dir(&probe_ctx.base_dir);
    let cfg = LauncherConfig::from_source(&source);
    let ctx = ExecutionContext::detect(&cfg).context("Failed to determine the base directory")?;
    Ok((cfg, ctx))
}

/// Extract the fast tool and, if the base directory has none, the manifest.
/// Only runs when packaged; every failure here is logged and recovered.
fn extract_bundled(
    ctx: &ExecutionContext,
    cfg: &LauncherConfig,
) -> (ExecutionContext, Option<std::path::PathBuf>) {
    if !ctx.is_packaged {
        return (ctx.clone(), None);
    }
    tracing::info!("Running from packaged launcher, extracting bundled resources...");

    let tools = ResourceExtractor::for_context(ctx, cfg, TOOLS_SUBDIR);
    let embedded_tool = match tools.extract_executable(ctx.layout.fast_tool) {
        Ok(extracted) => Some(extracted.path),
        Err(ExtractError::ResourceMissing { .. }) => {
            tracing::info!("No bundled {}, will look on PATH", ctx.layout.fast_tool);
            None
        }
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    };

    let manifest = if ctx.manifest_path.is_some() {
        None
    } else {
        let project = ResourceExtractor::for_context(ctx, cfg, MANIFEST_SUBDIR);
        match project.extract(&cfg.manifest_name) {
            Ok(extracted) => {
                tracing::info!("Extracted {}", cfg.manifest_name);
                Some(extracted.path)
            }
            Err(e) => {
                tracing::warn!("{}; running without dependency install", e);
                None
            }
        }
    };

    (ctx.clone().with_manifest(manifest), embedded_tool)
}
