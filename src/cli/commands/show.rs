//! Implementation of the `nixforge show` command: display what would be
//! evaluated without building anything.

use anyhow::Result;
use console::style;

use crate::cli::context::ShellContext;
use crate::domain::models::SourceRef;

pub fn execute(ctx: &ShellContext) -> Result<()> {
    match &ctx.spec.source {
        SourceRef::Generated => {
            println!("{}", ctx.realizer.render_expr(&ctx.spec));
        }
        SourceRef::Flake { url, .. } => {
            println!("{} {url}", style("# Flake reference:").dim());
        }
        SourceRef::NixFile { path } => {
            println!("{} {}", style("# File:").dim(), path.display());
        }
    }
    Ok(())
}
