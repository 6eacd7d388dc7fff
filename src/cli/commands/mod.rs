//! CLI command implementations

pub mod check;
pub mod config;
pub mod fmt;
pub mod status;

pub use check::execute as check;
pub use config::execute as config;
pub use fmt::execute_check as fmt_check;
pub use fmt::execute_fix as fmt_fix;
pub use status::execute as status;

use crate::cli::args::OpArgs;
use crate::config::Config;
use crate::engine::{ContainerEngine, PodmanEngine};
use crate::environment::Environment;
use crate::error::{CrucibleError, CrucibleResult};
use crate::provision::{self, ProvisionConfig, ToolchainSpec};
use std::path::PathBuf;
use tracing::debug;

/// Validate inputs, construct the environment plan and a ready engine.
///
/// Input paths are checked before the engine is touched so bad
/// arguments fail fast without a container runtime present.
pub(crate) async fn prepare(
    args: &OpArgs,
    config: &Config,
) -> CrucibleResult<(PodmanEngine, Environment, PathBuf)> {
    let source = args.source.clone().unwrap_or_else(|| PathBuf::from("."));
    let source = source
        .canonicalize()
        .map_err(|_| CrucibleError::PathNotFound(source.clone()))?;
    if !source.is_dir() {
        return Err(CrucibleError::PathNotFound(source));
    }

    if let Some(descriptor) = &args.toolchain_file {
        if !descriptor.is_file() {
            return Err(CrucibleError::PathNotFound(descriptor.clone()));
        }
    }
    let spec = ToolchainSpec::from_file(args.toolchain_file.clone());

    let mut extra_packages = config.environment.packages.clone();
    for package in &args.packages {
        if !extra_packages.contains(package) {
            extra_packages.push(package.clone());
        }
    }

    let provision_config = ProvisionConfig::from_config(config);
    debug!(
        "Provisioning from {} with {:?} toolchain",
        provision_config.base_image, spec
    );
    let env = provision::dev_environment(&provision_config, &source, &spec, &extra_packages);

    let engine = PodmanEngine::new()?;
    engine.ensure_ready().await?;

    Ok((engine, env, source))
}
