//! Immutable container environment plan
//!
//! An [`Environment`] is a value describing a container state: base
//! image, package set, environment variables, mounts, working directory
//! and a queue of commands. Builder methods consume `self` and return a
//! new value, so a handle is never mutated in place — operations derive
//! their own copy and the original stays valid for reuse.
//!
//! Nothing here talks to a container runtime. Execution is deferred
//! until a [`crate::engine::ContainerEngine`] forces the plan.

pub mod changeset;

pub use changeset::{ChangeKind, ChangeSet, DirectorySnapshot, FileChange};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A mount point inside the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mount {
    /// Named persistent cache volume, shared across invocations
    Cache { volume: String },
    /// Single file from the host
    File { source: PathBuf },
    /// Directory tree from the host
    Directory { source: PathBuf },
}

/// A deferred command step.
///
/// Captures the mount set in effect when the step was appended, so a
/// later overlay (mounting the source tree over the workdir) cannot
/// retroactively change what an earlier step sees. This mirrors how
/// layered container builds work: each command runs against the state
/// that existed at its point in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecStep {
    /// Argument vector, argv[0] is the program
    pub argv: Vec<String>,
    mounts: BTreeMap<String, Mount>,
}

impl ExecStep {
    /// Render the step for logs and error messages
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }

    /// Mounts in effect when this step executes
    pub fn mounts(&self) -> &BTreeMap<String, Mount> {
        &self.mounts
    }
}

/// Immutable description of a container environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    image: String,
    packages: Vec<String>,
    env: Vec<(String, String)>,
    mounts: BTreeMap<String, Mount>,
    workdir: Option<String>,
    execs: Vec<ExecStep>,
}

impl Environment {
    /// Create an environment from a base image and package set
    pub fn new(image: impl Into<String>, packages: Vec<String>) -> Self {
        Self {
            image: image.into(),
            packages,
            env: Vec::new(),
            mounts: BTreeMap::new(),
            workdir: None,
            execs: Vec::new(),
        }
    }

    /// Set an environment variable. Last write wins per key.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.env.retain(|(k, _)| *k != key);
        self.env.push((key, value.into()));
        self
    }

    /// Mount a named cache volume at a container path
    pub fn with_mounted_cache(
        mut self,
        container_path: impl Into<String>,
        volume: impl Into<String>,
    ) -> Self {
        self.mounts.insert(
            container_path.into(),
            Mount::Cache {
                volume: volume.into(),
            },
        );
        self
    }

    /// Mount a single host file at a container path
    pub fn with_mounted_file(
        mut self,
        container_path: impl Into<String>,
        source: impl Into<PathBuf>,
    ) -> Self {
        self.mounts.insert(
            container_path.into(),
            Mount::File {
                source: source.into(),
            },
        );
        self
    }

    /// Mount a host directory at a container path.
    ///
    /// Shadows any file mounts under that path for steps appended from
    /// here on: the shadowed mounts are dropped from the plan, while
    /// steps already appended keep the mount set they captured.
    pub fn with_mounted_directory(
        mut self,
        container_path: impl Into<String>,
        source: impl Into<PathBuf>,
    ) -> Self {
        let container_path = container_path.into();
        let prefix = format!("{}/", container_path.trim_end_matches('/'));
        self.mounts
            .retain(|path, mount| !(matches!(mount, Mount::File { .. }) && path.starts_with(&prefix)));
        self.mounts.insert(
            container_path,
            Mount::Directory {
                source: source.into(),
            },
        );
        self
    }

    /// Set the working directory
    pub fn with_workdir(mut self, path: impl Into<String>) -> Self {
        self.workdir = Some(path.into());
        self
    }

    /// Append a deferred command step, capturing the current mount set
    pub fn with_exec<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execs.push(ExecStep {
            argv: argv.into_iter().map(Into::into).collect(),
            mounts: self.mounts.clone(),
        });
        self
    }

    /// Base image reference
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Package set baked into the base image
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Environment variables in application order
    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Look up an environment variable by key
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Mounts keyed by container path
    pub fn mounts(&self) -> &BTreeMap<String, Mount> {
        &self.mounts
    }

    /// Look up a mount by container path
    pub fn mount(&self, container_path: &str) -> Option<&Mount> {
        self.mounts.get(container_path)
    }

    /// Host source of the directory mounted at `container_path`, if any
    pub fn mounted_directory(&self, container_path: &str) -> Option<&Path> {
        match self.mounts.get(container_path) {
            Some(Mount::Directory { source }) => Some(source),
            _ => None,
        }
    }

    /// Working directory, if set
    pub fn workdir(&self) -> Option<&str> {
        self.workdir.as_deref()
    }

    /// Deferred command steps in execution order
    pub fn execs(&self) -> &[ExecStep] {
        &self.execs
    }
}
