//! Format commands - verification and auto-fix

use crate::cli::args::{FmtFixArgs, OpArgs};
use crate::config::Config;
use crate::environment::ChangeKind;
use crate::error::CrucibleResult;
use crate::ops;
use console::style;

/// Execute the fmt-check command
pub async fn execute_check(args: OpArgs, config: &Config) -> CrucibleResult<()> {
    let (engine, env, _source) = super::prepare(&args, config).await?;

    let output = ops::fmt_check(&engine, &env).await?;
    if output.trim().is_empty() {
        println!("{}", style("Formatting clean").green());
    } else {
        print!("{}", output);
    }

    Ok(())
}

/// Execute the fmt-fix command
pub async fn execute_fix(args: FmtFixArgs, config: &Config) -> CrucibleResult<()> {
    let (engine, env, source) = super::prepare(&args.op, config).await?;

    let changes = ops::fmt_fix(&engine, &env, &source).await?;

    if changes.is_empty() {
        println!("{}", style("Already formatted, no changes").green());
        return Ok(());
    }

    for change in changes.changes() {
        let marker = match change.kind {
            ChangeKind::Added => style("A").green(),
            ChangeKind::Removed => style("D").red(),
            ChangeKind::Modified => style("M").yellow(),
        };
        println!("{} {}", marker, change.path);
    }

    if args.write {
        changes.materialize(&source)?;
        println!(
            "{} {} file(s) updated",
            style("Applied:").bold().green(),
            changes.len()
        );
    } else {
        println!(
            "{} {} file(s) would change. Run with --write to apply.",
            style("Dry run:").bold().yellow(),
            changes.len()
        );
    }

    Ok(())
}
