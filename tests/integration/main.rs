//! Integration tests for Crucible

mod cli_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn crucible() -> Command {
        Command::cargo_bin("crucible").unwrap()
    }

    #[test]
    fn help_displays() {
        crucible()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "reproducible, cached Rust build environments",
            ));
    }

    #[test]
    fn version_displays() {
        crucible()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("crucible"));
    }

    #[test]
    fn config_path() {
        crucible()
            .args(["--no-local", "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_prints_defaults() {
        crucible()
            .args(["--no-local", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[environment]"))
            .stdout(predicate::str::contains("wolfi-base"));
    }

    #[test]
    fn config_show_honors_config_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\ntarget_volume = \"target-ci\"\n").unwrap();

        crucible()
            .args(["--no-local", "--config"])
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("target-ci"));
    }

    #[test]
    fn check_rejects_missing_source() {
        crucible()
            .args(["--no-local", "check", "--source", "/nonexistent/crucible-src"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }

    #[test]
    fn fmt_check_rejects_missing_toolchain_file() {
        let dir = tempfile::tempdir().unwrap();

        crucible()
            .args(["--no-local", "fmt-check", "--toolchain-file", "/nonexistent/pin.toml"])
            .args(["--source"])
            .arg(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn invalid_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "environment = nope").unwrap();

        crucible()
            .args(["--no-local", "--config"])
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn status_runs_without_engine() {
        // Status reports missing Podman instead of failing
        crucible()
            .args(["--no-local", "status"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Crucible System Status"));
    }
}
