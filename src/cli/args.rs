//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Crucible - reproducible, cached Rust build environments
///
/// Provisions a containerized Rust toolchain with persistent caches and
/// runs check/format operations against a source tree.
#[derive(Parser, Debug)]
#[command(name = "crucible")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CRUCIBLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .crucible.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run cargo check across all targets and workspace members
    Check(OpArgs),

    /// Verify formatting without writing any files
    FmtCheck(OpArgs),

    /// Format the source tree and report the resulting changes
    FmtFix(FmtFixArgs),

    /// Check engine health and cache state
    Status,

    /// Show or locate configuration
    Config(ConfigArgs),
}

/// Arguments shared by the environment-backed operations
#[derive(Parser, Debug)]
pub struct OpArgs {
    /// Source tree to operate on (defaults to current directory)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Toolchain descriptor pinning version/profile; omit for latest stable
    #[arg(short, long)]
    pub toolchain_file: Option<PathBuf>,

    /// Additional system package to install (repeatable)
    #[arg(short, long = "package")]
    pub packages: Vec<String>,
}

/// Arguments for the fmt-fix command
#[derive(Parser, Debug)]
pub struct FmtFixArgs {
    #[command(flatten)]
    pub op: OpArgs,

    /// Write the formatting changes back into the source tree
    #[arg(long)]
    pub write: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action (defaults to show)
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommand actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_parses_operation_args() {
        let cli = Cli::parse_from([
            "crucible",
            "check",
            "--source",
            "/tmp/project",
            "--toolchain-file",
            "/tmp/rust-toolchain.toml",
            "--package",
            "git",
            "--package",
            "jq",
        ]);

        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.source, Some(PathBuf::from("/tmp/project")));
                assert_eq!(
                    args.toolchain_file,
                    Some(PathBuf::from("/tmp/rust-toolchain.toml"))
                );
                assert_eq!(args.packages, vec!["git", "jq"]);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn fmt_fix_parses_write_flag() {
        let cli = Cli::parse_from(["crucible", "fmt-fix", "--write"]);
        match cli.command {
            Commands::FmtFix(args) => assert!(args.write),
            _ => panic!("expected fmt-fix"),
        }
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::parse_from(["crucible", "-vv", "status"]);
        assert_eq!(cli.verbose, 2);
    }
}
