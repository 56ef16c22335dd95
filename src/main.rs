//! nixforge CLI entry point.

use clap::Parser;

use nixforge::cli::context::ShellContext;
use nixforge::cli::output::print_error;
use nixforge::cli::{Cli, Commands};
use nixforge::infrastructure::{logging, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => {
            print_error(&err);
            std::process::exit(1);
        }
    };
    logging::init(&config.logging.level, cli.verbose);

    let ctx = ShellContext::new(config, &cli.shell);
    let result = match cli.command.unwrap_or(Commands::Env) {
        Commands::Env => nixforge::cli::commands::env::execute(&ctx).await,
        Commands::Activate => nixforge::cli::commands::activate::execute(&ctx).await,
        Commands::Build => nixforge::cli::commands::build::execute(&ctx).await,
        Commands::Show => nixforge::cli::commands::show::execute(&ctx),
    };

    if let Err(err) = result {
        print_error(&err);
        std::process::exit(1);
    }
}
