//! Podman-backed container engine
//!
//! Implements the ContainerEngine trait by shelling out to rootless
//! Podman. The base image is built once per (image, package set) pair
//! with a content-addressed tag, so repeat invocations skip the build.
//! Host directories named in the plan are staged into a session temp
//! dir before mounting, so commands never write the caller's tree in
//! place and the original stays pristine for diffing.

use crate::environment::{DirectorySnapshot, Environment, ExecStep, Mount};
use crate::error::{CrucibleError, CrucibleResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Container engine using rootless Podman
pub struct PodmanEngine {
    session: TempDir,
    staged: Mutex<HashMap<PathBuf, PathBuf>>,
}

impl PodmanEngine {
    /// Create a new Podman engine with a fresh staging session
    pub fn new() -> CrucibleResult<Self> {
        let session = TempDir::new()
            .map_err(|e| CrucibleError::io("creating staging directory", e))?;
        Ok(Self {
            session,
            staged: Mutex::new(HashMap::new()),
        })
    }

    /// Check if Podman is installed
    async fn podman_installed() -> bool {
        Command::new("podman")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Check if rootless Podman is properly configured
    async fn rootless_configured() -> CrucibleResult<bool> {
        let output = Command::new("podman")
            .args(["info", "--format", "{{.Host.Security.Rootless}}"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CrucibleError::command_failed("podman info", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim() == "true")
    }

    /// Execute a Podman command and return the output
    async fn podman(&self, args: &[String]) -> CrucibleResult<std::process::Output> {
        debug!("Executing: podman {:?}", args);

        Command::new("podman")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CrucibleError::command_failed(format!("podman {:?}", args), e))
    }

    /// Check if an image exists locally
    async fn image_exists(&self, tag: &str) -> CrucibleResult<bool> {
        let output = self
            .podman(&["image".to_string(), "exists".to_string(), tag.to_string()])
            .await?;
        Ok(output.status.success())
    }

    /// Build the base image for the plan if it is not already cached
    async fn ensure_image(&self, env: &Environment) -> CrucibleResult<String> {
        let tag = image_tag(env.image(), env.packages());

        if self.image_exists(&tag).await? {
            debug!("Base image already cached: {}", tag);
            return Ok(tag);
        }

        info!("Building base image: {}", tag);
        let build_dir = TempDir::new()
            .map_err(|e| CrucibleError::io("creating image build directory", e))?;
        tokio::fs::write(
            build_dir.path().join("Containerfile"),
            containerfile(env.image(), env.packages()),
        )
        .await
        .map_err(|e| CrucibleError::io("writing Containerfile", e))?;

        let output = self
            .podman(&[
                "build".to_string(),
                "-t".to_string(),
                tag.clone(),
                build_dir.path().display().to_string(),
            ])
            .await?;

        if !output.status.success() {
            return Err(CrucibleError::ImageBuild {
                tag,
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(tag)
    }

    /// Which of the given named volumes already exist on the host.
    ///
    /// Reads `podman volume ls` JSON output; listing failures degrade
    /// to "none exist" since this is informational only.
    pub async fn existing_volumes(&self, names: &[String]) -> CrucibleResult<Vec<String>> {
        let output = self
            .podman(&[
                "volume".to_string(),
                "ls".to_string(),
                "--format".to_string(),
                "json".to_string(),
            ])
            .await?;
        if !output.status.success() {
            return Ok(Vec::new());
        }

        let listed: Vec<serde_json::Value> =
            serde_json::from_slice(&output.stdout).unwrap_or_default();
        let present: Vec<&str> = listed
            .iter()
            .filter_map(|v| v.get("Name").and_then(|n| n.as_str()))
            .collect();

        Ok(names
            .iter()
            .filter(|name| present.contains(&name.as_str()))
            .cloned()
            .collect())
    }

    /// Resolve a mount set to `-v` arguments, staging directories on
    /// first use
    fn mount_args(&self, mounts: &BTreeMap<String, Mount>) -> CrucibleResult<Vec<String>> {
        let mut args = Vec::new();
        for (container_path, mount) in mounts {
            match mount {
                Mount::Cache { volume } => {
                    args.push("-v".to_string());
                    args.push(format!("{}:{}", volume, container_path));
                }
                Mount::File { source } => {
                    let source = source
                        .canonicalize()
                        .map_err(|_| CrucibleError::PathNotFound(source.clone()))?;
                    args.push("-v".to_string());
                    args.push(format!("{}:{}:ro", source.display(), container_path));
                }
                Mount::Directory { source } => {
                    let staged = self.stage_directory(source)?;
                    args.push("-v".to_string());
                    args.push(format!("{}:{}", staged.display(), container_path));
                }
            }
        }
        Ok(args)
    }

    /// Copy a host directory into the staging session.
    ///
    /// Each source is staged once per session and the same copy is
    /// reused by every command step, so mutations made by one step are
    /// visible to the next and to the final snapshot.
    fn stage_directory(&self, source: &Path) -> CrucibleResult<PathBuf> {
        let source = source
            .canonicalize()
            .map_err(|_| CrucibleError::PathNotFound(source.to_path_buf()))?;

        let mut staged = self
            .staged
            .lock()
            .map_err(|_| CrucibleError::Internal("staging map poisoned".to_string()))?;
        if let Some(path) = staged.get(&source) {
            return Ok(path.clone());
        }

        let dest = self.session.path().join(format!("mount{}", staged.len()));
        copy_tree(&source, &dest).map_err(|e| CrucibleError::MountStage {
            path: source.clone(),
            reason: e.to_string(),
        })?;
        debug!("Staged {} at {}", source.display(), dest.display());

        staged.insert(source, dest.clone());
        Ok(dest)
    }

    /// Execute every step of the plan in order, returning the last
    /// step's stdout.
    ///
    /// Mounts are resolved per step from the set the step captured, so
    /// a step appended before the source overlay (the descriptor-based
    /// toolchain install) still runs with its file mount in place.
    async fn force(&self, env: &Environment) -> CrucibleResult<String> {
        let tag = self.ensure_image(env).await?;

        let mut last_stdout = String::new();
        for step in env.execs() {
            let mounts = self.mount_args(step.mounts())?;
            last_stdout = self.run_step(env, &tag, &mounts, step).await?;
        }
        Ok(last_stdout)
    }

    /// Run one command step in a fresh container
    async fn run_step(
        &self,
        env: &Environment,
        tag: &str,
        mounts: &[String],
        step: &ExecStep,
    ) -> CrucibleResult<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        args.extend_from_slice(mounts);
        for (key, value) in env.env_vars() {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        if let Some(workdir) = env.workdir() {
            args.push("-w".to_string());
            args.push(workdir.to_string());
        }
        args.push(tag.to_string());
        args.extend(step.argv.iter().cloned());

        info!("Running: {}", step.display());
        let output = self.podman(&args).await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CrucibleError::command_exit(
                step.display(),
                output.status.code().unwrap_or(-1),
                format!("{}{}", stdout, stderr),
            ));
        }
        Ok(stdout)
    }
}

#[async_trait]
impl crate::engine::ContainerEngine for PodmanEngine {
    async fn is_available(&self) -> CrucibleResult<bool> {
        if !Self::podman_installed().await {
            return Ok(false);
        }
        Self::rootless_configured().await
    }

    async fn ensure_ready(&self) -> CrucibleResult<()> {
        if !Self::podman_installed().await {
            return Err(CrucibleError::EngineNotFound {
                name: "podman".to_string(),
                hint: "Install from https://podman.io".to_string(),
            });
        }
        if !Self::rootless_configured().await? {
            return Err(CrucibleError::EngineNotReady {
                reason: "rootless Podman not configured".to_string(),
            });
        }
        Ok(())
    }

    async fn sync(&self, env: &Environment) -> CrucibleResult<()> {
        self.force(env).await.map(|_| ())
    }

    async fn captured_stdout(&self, env: &Environment) -> CrucibleResult<String> {
        self.force(env).await
    }

    async fn snapshot_directory(
        &self,
        env: &Environment,
        container_path: &str,
    ) -> CrucibleResult<DirectorySnapshot> {
        self.force(env).await?;

        let source = env
            .mounted_directory(container_path)
            .ok_or_else(|| CrucibleError::MountNotFound(container_path.to_string()))?;
        let source = source
            .canonicalize()
            .map_err(|_| CrucibleError::PathNotFound(source.to_path_buf()))?;

        let staged = self
            .staged
            .lock()
            .map_err(|_| CrucibleError::Internal("staging map poisoned".to_string()))?
            .get(&source)
            .cloned()
            .ok_or_else(|| CrucibleError::MountNotFound(container_path.to_string()))?;

        DirectorySnapshot::capture(&staged)
    }

    fn engine_name(&self) -> &'static str {
        "Podman"
    }
}

/// Content-addressed tag for a base image + package set.
///
/// Packages are sorted before hashing so the tag is independent of the
/// order extra packages were supplied in.
fn image_tag(image: &str, packages: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.as_bytes());

    let mut sorted: Vec<&String> = packages.iter().collect();
    sorted.sort();
    sorted.dedup();
    for package in sorted {
        hasher.update(b"\0");
        hasher.update(package.as_bytes());
    }

    let hash = hex::encode(hasher.finalize());
    format!("crucible-base-{}", &hash[..12])
}

/// Render the Containerfile for a base image + package set
fn containerfile(image: &str, packages: &[String]) -> String {
    if packages.is_empty() {
        return format!("FROM {}\n", image);
    }
    format!(
        "FROM {}\nRUN apk add --no-cache {}\n",
        image,
        packages.join(" ")
    )
}

/// Recursively copy a directory tree, recreating symlinks as-is so the
/// staged copy matches the caller's tree
fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| std::io::Error::other("walkdir loop"))
        })?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let target = dest.join(rel);
        if entry.file_type().is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, &target)?;
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use tempfile::TempDir;

    #[test]
    fn image_tag_is_order_independent() {
        let a = image_tag(
            "wolfi-base",
            &["rustup".to_string(), "git".to_string(), "curl".to_string()],
        );
        let b = image_tag(
            "wolfi-base",
            &["curl".to_string(), "rustup".to_string(), "git".to_string()],
        );
        assert_eq!(a, b);
        assert!(a.starts_with("crucible-base-"));
    }

    #[test]
    fn image_tag_ignores_duplicates() {
        let a = image_tag("wolfi-base", &["git".to_string(), "git".to_string()]);
        let b = image_tag("wolfi-base", &["git".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn image_tag_varies_with_inputs() {
        let a = image_tag("wolfi-base", &["git".to_string()]);
        let b = image_tag("wolfi-base", &["curl".to_string()]);
        let c = image_tag("alpine", &["git".to_string()]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn containerfile_renders_packages() {
        let rendered = containerfile(
            "cgr.dev/chainguard/wolfi-base",
            &["rustup".to_string(), "build-base".to_string()],
        );
        assert_eq!(
            rendered,
            "FROM cgr.dev/chainguard/wolfi-base\nRUN apk add --no-cache rustup build-base\n"
        );
    }

    #[test]
    fn containerfile_without_packages_is_bare_from() {
        assert_eq!(containerfile("alpine", &[]), "FROM alpine\n");
    }

    #[test]
    fn copy_tree_copies_nested_files() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        std::fs::create_dir_all(source.path().join("src")).unwrap();
        std::fs::write(source.path().join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(source.path().join("Cargo.toml"), "[package]").unwrap();

        let target = dest.path().join("copy");
        copy_tree(source.path(), &target).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("src/main.rs")).unwrap(),
            "fn main() {}"
        );
        assert_eq!(
            std::fs::read_to_string(target.join("Cargo.toml")).unwrap(),
            "[package]"
        );
    }

    #[test]
    fn copy_tree_preserves_symlinks() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        std::fs::write(source.path().join("lib.rs"), "pub fn f() {}").unwrap();
        std::os::unix::fs::symlink("lib.rs", source.path().join("alias.rs")).unwrap();

        let target = dest.path().join("copy");
        copy_tree(source.path(), &target).unwrap();

        let staged_link = target.join("alias.rs");
        assert!(staged_link.symlink_metadata().unwrap().is_symlink());
        assert_eq!(
            std::fs::read_link(&staged_link).unwrap(),
            PathBuf::from("lib.rs")
        );
    }

    #[test]
    fn staging_reuses_copies_within_a_session() {
        let engine = PodmanEngine::new().unwrap();
        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("lib.rs"), "").unwrap();

        let first = engine.stage_directory(source.path()).unwrap();
        let second = engine.stage_directory(source.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn mount_args_cover_all_mount_kinds() {
        let engine = PodmanEngine::new().unwrap();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("rust-toolchain.toml");
        std::fs::write(&file, "[toolchain]\nchannel = \"1.75\"\n").unwrap();

        let env = Environment::new("wolfi-base", vec![])
            .with_mounted_cache("/usr/local/cargo", "cargo-home")
            .with_mounted_file("/src/rust-toolchain.toml", &file)
            .with_mounted_directory("/src", dir.path());

        let args = engine.mount_args(env.mounts()).unwrap();
        let rendered = args.join(" ");
        assert!(rendered.contains("cargo-home:/usr/local/cargo"));
        assert!(rendered.contains(":/src "));
        // File mount was shadowed by the directory mount at /src
        assert!(!rendered.contains("rust-toolchain.toml"));
    }

    #[test]
    fn install_step_resolves_with_its_captured_descriptor_mount() {
        let engine = PodmanEngine::new().unwrap();
        let dir = TempDir::new().unwrap();
        let descriptor = dir.path().join("pin.toml");
        std::fs::write(&descriptor, "[toolchain]\nchannel = \"1.75\"\n").unwrap();

        let env = Environment::new("wolfi-base", vec![])
            .with_mounted_file("/src/rust-toolchain.toml", &descriptor)
            .with_exec(["rustup", "toolchain", "install"])
            .with_mounted_directory("/src", dir.path())
            .with_exec(["cargo", "check"]);

        let install_args = engine.mount_args(env.execs()[0].mounts()).unwrap();
        assert!(install_args
            .iter()
            .any(|a| a.ends_with(":/src/rust-toolchain.toml:ro")));

        let check_args = engine.mount_args(env.execs()[1].mounts()).unwrap();
        assert!(!check_args.iter().any(|a| a.contains("rust-toolchain.toml")));
        assert!(check_args.iter().any(|a| a.ends_with(":/src")));
    }
}
