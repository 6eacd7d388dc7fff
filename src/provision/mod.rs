//! Environment provisioning pipeline
//!
//! Builds the layered Rust CI environment: base image with the fixed
//! package set, toolchain installation, then source + cache assembly.
//! Each step is a pure `Environment -> Environment` function; nothing
//! executes until an engine forces the finished plan.
//!
//! The three cache volumes (cargo-home, rustup-home, target) are named
//! volumes shared across all invocations over time, including
//! concurrent ones. No locking is imposed: two simultaneous runs
//! against the same names may observe each other's partial writes.
//! Known race, accepted for build speed — cargo and rustup caches are
//! append-mostly and tolerate it in practice.

use crate::config::Config;
use crate::environment::Environment;
use std::path::{Path, PathBuf};

/// Default base image (Wolfi, apk-based)
pub const DEFAULT_BASE_IMAGE: &str = "cgr.dev/chainguard/wolfi-base";

/// Packages every environment needs: toolchain installer, native build
/// toolchain, TLS headers, pkg-config and a transfer client
pub const REQUIRED_PACKAGES: [&str; 5] =
    ["rustup", "build-base", "openssl-dev", "pkgconf", "curl"];

/// Well-known descriptor filename rustup reads from the workdir
pub const TOOLCHAIN_FILE_NAME: &str = "rust-toolchain.toml";

/// Declarative settings for environment construction.
///
/// Kept as one record rather than literals scattered through the
/// pipeline, so tests and config can override any of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    /// Base image reference
    pub base_image: String,
    /// Fixed package set installed into every environment
    pub required_packages: Vec<String>,
    /// CARGO_HOME inside the container
    pub cargo_home: String,
    /// RUSTUP_HOME inside the container
    pub rustup_home: String,
    /// Working directory the source tree is mounted at
    pub workdir: String,
    /// Named volume backing CARGO_HOME
    pub cargo_home_volume: String,
    /// Named volume backing RUSTUP_HOME
    pub rustup_home_volume: String,
    /// Named volume backing the build-artifact directory
    pub target_volume: String,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            required_packages: REQUIRED_PACKAGES.iter().map(|p| p.to_string()).collect(),
            cargo_home: "/usr/local/cargo".to_string(),
            rustup_home: "/usr/local/rustup".to_string(),
            workdir: "/src".to_string(),
            cargo_home_volume: "cargo-home".to_string(),
            rustup_home_volume: "rustup-home".to_string(),
            target_volume: "target".to_string(),
        }
    }
}

impl ProvisionConfig {
    /// Build provisioning settings from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            base_image: config.environment.image.clone(),
            workdir: config.environment.workdir.clone(),
            cargo_home_volume: config.cache.cargo_home_volume.clone(),
            rustup_home_volume: config.cache.rustup_home_volume.clone(),
            target_volume: config.cache.target_volume.clone(),
            ..defaults
        }
    }

    /// Container path the target cache is mounted at
    pub fn target_path(&self) -> String {
        format!("{}/target", self.workdir)
    }

    /// Container path the toolchain descriptor is mounted at
    pub fn toolchain_file_path(&self) -> String {
        format!("{}/{}", self.workdir, TOOLCHAIN_FILE_NAME)
    }
}

/// Which toolchain to install into the environment.
///
/// Selected once during assembly; the two paths are mutually exclusive
/// and there is no merge mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainSpec {
    /// Explicit descriptor file pinning version/profile
    Pinned(PathBuf),
    /// No descriptor; latest stable at execution time
    DefaultStable,
}

impl ToolchainSpec {
    /// Presence of a descriptor always wins; absence falls back to stable
    pub fn from_file(file: Option<PathBuf>) -> Self {
        match file {
            Some(path) => Self::Pinned(path),
            None => Self::DefaultStable,
        }
    }
}

/// Build the base environment: image with the required package set
/// (plus caller extras), persistent tool-state mounts and a primed PATH.
///
/// Duplicate extras are tolerated; ordering does not affect the result
/// beyond package-list order, which the engine canonicalizes.
pub fn build_base(config: &ProvisionConfig, extra_packages: &[String]) -> Environment {
    let mut packages = config.required_packages.clone();
    for package in extra_packages {
        if !packages.contains(package) {
            packages.push(package.clone());
        }
    }

    Environment::new(&config.base_image, packages)
        .with_env("CARGO_HOME", &config.cargo_home)
        .with_env("RUSTUP_HOME", &config.rustup_home)
        .with_mounted_cache(&config.cargo_home, &config.cargo_home_volume)
        .with_mounted_cache(&config.rustup_home, &config.rustup_home_volume)
        .with_exec(["rustup-init", "-y", "--default-toolchain", "none"])
        .with_env(
            "PATH",
            format!(
                "{}/bin:/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin",
                config.cargo_home
            ),
        )
        .with_workdir(&config.workdir)
}

/// Install the selected toolchain into the environment.
///
/// Pinned descriptors are mounted under the well-known filename so the
/// installer reads version and profile from them; otherwise the stable
/// channel is installed directly. Installer failure is fatal when the
/// plan is forced; there is no retry.
pub fn resolve_toolchain(
    config: &ProvisionConfig,
    env: Environment,
    spec: &ToolchainSpec,
) -> Environment {
    match spec {
        ToolchainSpec::Pinned(descriptor) => env
            .with_mounted_file(config.toolchain_file_path(), descriptor.clone())
            .with_exec(["rustup", "toolchain", "install"]),
        ToolchainSpec::DefaultStable => {
            env.with_exec(["rustup", "toolchain", "install", "stable"])
        }
    }
}

/// Mount the caller's source tree and the build-artifact cache,
/// producing the final environment used by all operations.
///
/// The source mount overlays the descriptor file mounted during
/// toolchain resolution, but only for steps appended from here on:
/// the toolchain install step already captured the descriptor mount
/// and still executes with it in place.
pub fn assemble(config: &ProvisionConfig, env: Environment, source: &Path) -> Environment {
    env.with_mounted_directory(&config.workdir, source)
        .with_mounted_cache(config.target_path(), &config.target_volume)
}

/// Full construction pipeline: base → toolchain → assembly
pub fn dev_environment(
    config: &ProvisionConfig,
    source: &Path,
    spec: &ToolchainSpec,
    extra_packages: &[String],
) -> Environment {
    let env = build_base(config, extra_packages);
    let env = resolve_toolchain(config, env, spec);
    assemble(config, env, source)
}
