//! Implementation of the `nixforge env` command: print shell commands
//! that activate the environment, suitable for `eval "$(nixforge env)"`.

use anyhow::Result;

use crate::cli::context::ShellContext;

pub async fn execute(ctx: &ShellContext) -> Result<()> {
    let env = ctx.realize().await?;
    print!("{}", env.to_export_script());
    Ok(())
}
