//! Container engine abstraction
//!
//! Provides a trait for forcing execution of an [`Environment`] plan.
//! The engine owns everything the plan defers to it: image layering,
//! named cache volumes, mounts and remote command execution. Crucible
//! is a client of these capabilities and never reimplements them.

mod podman;

pub use podman::PodmanEngine;

use crate::environment::{DirectorySnapshot, Environment};
use crate::error::CrucibleResult;
use async_trait::async_trait;

/// Abstract container engine interface
///
/// Forcing a plan executes its command steps strictly in order; any
/// non-zero exit fails the whole call with the command's captured
/// output attached. Each call is a single blocking attempt — no
/// retries, no partial success.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Check if the engine is available on this system
    async fn is_available(&self) -> CrucibleResult<bool>;

    /// Ensure the engine is ready (installed, rootless setup, etc.)
    async fn ensure_ready(&self) -> CrucibleResult<()>;

    /// Force execution of the plan, discarding output
    async fn sync(&self, env: &Environment) -> CrucibleResult<()>;

    /// Force execution of the plan and return stdout of the last step
    async fn captured_stdout(&self, env: &Environment) -> CrucibleResult<String>;

    /// Force execution, then capture the content state of the directory
    /// mounted at `container_path`
    async fn snapshot_directory(
        &self,
        env: &Environment,
        container_path: &str,
    ) -> CrucibleResult<DirectorySnapshot>;

    /// Human-readable engine name for display
    fn engine_name(&self) -> &'static str;
}
