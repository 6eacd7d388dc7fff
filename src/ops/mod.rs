//! Operation executors
//!
//! The three verification operations against an assembled environment:
//! check, format verification and format auto-fix. Each derives its own
//! plan from the environment it is given — the input handle is never
//! mutated — and makes a single blocking attempt against the engine.
//! Failures carry the underlying tool's captured output and are never
//! retried here; re-invoking is the caller's decision.

use crate::engine::ContainerEngine;
use crate::environment::{ChangeSet, DirectorySnapshot, Environment};
use crate::error::{CrucibleError, CrucibleResult};
use std::path::Path;
use tracing::info;

/// Run `cargo check` across all targets and workspace members,
/// returning the captured stdout.
pub async fn check(engine: &dyn ContainerEngine, env: &Environment) -> CrucibleResult<String> {
    info!("Running cargo check");
    let plan = env
        .clone()
        .with_exec(["cargo", "check", "--all", "--all-targets"]);
    engine.captured_stdout(&plan).await
}

/// Run `cargo fmt` in verification mode across all workspace members.
///
/// Installs the rustfmt component first; formatting violations surface
/// as a command failure carrying the formatter's diff output.
pub async fn fmt_check(engine: &dyn ContainerEngine, env: &Environment) -> CrucibleResult<String> {
    info!("Running cargo fmt --check");
    let plan = env
        .clone()
        .with_exec(["rustup", "component", "add", "rustfmt"])
        .with_exec(["cargo", "fmt", "--all", "--check"]);
    engine.captured_stdout(&plan).await
}

/// Run `cargo fmt` in write mode and return the resulting changeset.
///
/// The original source tree is snapshotted before the formatter runs;
/// the formatted workdir is snapshotted afterwards and the two are
/// diffed. A formatter failure aborts before any diff is computed, so
/// there is no partial changeset.
pub async fn fmt_fix(
    engine: &dyn ContainerEngine,
    env: &Environment,
    source: &Path,
) -> CrucibleResult<ChangeSet> {
    let workdir = env
        .workdir()
        .ok_or_else(|| CrucibleError::Internal("environment has no workdir".to_string()))?
        .to_string();

    let base = DirectorySnapshot::capture(source)?;

    info!("Running cargo fmt");
    let plan = env
        .clone()
        .with_exec(["rustup", "component", "add", "rustfmt"])
        .with_exec(["cargo", "fmt", "--all"]);
    let formatted = engine.snapshot_directory(&plan, &workdir).await?;

    Ok(ChangeSet::diff(&formatted, &base))
}
