//! Configuration schema for Crucible
//!
//! Configuration is stored at `~/.config/crucible/config.toml`, with
//! optional project-local `.crucible.toml` overrides.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Environment construction settings
    pub environment: EnvironmentConfig,

    /// Cache volume names
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { verbose: false }
    }
}

/// Environment construction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Base image to build the environment from
    pub image: String,

    /// Extra system packages layered onto the fixed base set
    pub packages: Vec<String>,

    /// Working directory the source tree is mounted at
    pub workdir: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            image: "cgr.dev/chainguard/wolfi-base".to_string(),
            packages: vec![],
            workdir: "/src".to_string(),
        }
    }
}

/// Cache volume names.
///
/// Volumes are shared across invocations by name; renaming one starts
/// an empty cache without deleting the old volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Volume backing CARGO_HOME
    pub cargo_home_volume: String,

    /// Volume backing RUSTUP_HOME
    pub rustup_home_volume: String,

    /// Volume backing the build-artifact directory
    pub target_volume: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cargo_home_volume: "cargo-home".to_string(),
            rustup_home_volume: "rustup-home".to_string(),
            target_volume: "target".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_mount_plan() {
        let config = Config::default();
        assert_eq!(config.environment.image, "cgr.dev/chainguard/wolfi-base");
        assert_eq!(config.environment.workdir, "/src");
        assert_eq!(config.cache.cargo_home_volume, "cargo-home");
        assert_eq!(config.cache.rustup_home_volume, "rustup-home");
        assert_eq!(config.cache.target_volume, "target");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [environment]
            packages = ["git"]
            "#,
        )
        .unwrap();

        assert_eq!(config.environment.packages, vec!["git"]);
        assert_eq!(config.environment.image, "cgr.dev/chainguard/wolfi-base");
        assert_eq!(config.cache.target_volume, "target");
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.environment.image, config.environment.image);
    }
}
