//! Status command - check engine health and cache configuration

use crate::config::Config;
use crate::engine::{ContainerEngine, PodmanEngine};
use crate::error::CrucibleResult;
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");

/// Execute the status command
pub async fn execute(config: &Config) -> CrucibleResult<()> {
    println!("{}", style("Crucible System Status").bold().cyan());
    println!();

    println!("{}", style("Engine:").bold());
    let engine = PodmanEngine::new()?;
    let available = engine.is_available().await.unwrap_or(false);
    if available {
        println!("  {} {} available", CHECK, engine.engine_name());
    } else {
        println!(
            "  {} {} - install from https://podman.io",
            CROSS,
            style("Podman not available").red()
        );
    }

    println!();
    println!("{}", style("Environment:").bold());
    println!("  Base image: {}", config.environment.image);
    println!("  Workdir:    {}", config.environment.workdir);

    println!();
    println!("{}", style("Cache volumes (shared across invocations):").bold());
    let volumes = [
        ("cargo home", &config.cache.cargo_home_volume),
        ("rustup home", &config.cache.rustup_home_volume),
        ("target", &config.cache.target_volume),
    ];
    let existing = if available {
        let names: Vec<String> = volumes.iter().map(|(_, name)| (*name).clone()).collect();
        engine.existing_volumes(&names).await.unwrap_or_default()
    } else {
        Vec::new()
    };
    for (label, name) in volumes {
        let state = if existing.contains(name) {
            style("warm").green()
        } else {
            style("cold").dim()
        };
        println!("  {:<12} {} ({})", format!("{}:", label), name, state);
    }

    println!();
    if available {
        println!("{}", style("All critical checks passed").green().bold());
    } else {
        println!(
            "{}",
            style("Some checks failed - see above for details")
                .yellow()
                .bold()
        );
    }

    Ok(())
}
