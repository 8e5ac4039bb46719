use anyhow::Result;
use clap::Parser;

use neural_bridge::{
    app::load_config,
    cli::{handle_command, Cli, Commands},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    // Agents and init work without a valid configuration
    if matches!(cli.command, Commands::Agents | Commands::Init) {
        return handle_command(cli.command, Default::default()).await;
    }

    let config = load_config(cli.config.as_deref())?;
    handle_command(cli.command, config).await
}
