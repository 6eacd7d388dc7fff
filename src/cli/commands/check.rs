//! Check command - cargo check across the workspace

use crate::cli::args::OpArgs;
use crate::config::Config;
use crate::error::CrucibleResult;
use crate::ops;

/// Execute the check command
pub async fn execute(args: OpArgs, config: &Config) -> CrucibleResult<()> {
    let (engine, env, _source) = super::prepare(&args, config).await?;

    let output = ops::check(&engine, &env).await?;
    print!("{}", output);

    Ok(())
}
