use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};

use stockwatch::adapter::inbound::cli::command::Cli;
use stockwatch::adapter::inbound::cli::{self, output};
use stockwatch::infrastructure::bootstrap;
use stockwatch::infrastructure::config::Config;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    output::configure(output::OutputConfig::new(cli.json, cli.quiet));

    if let Err(e) = run(cli).await {
        error!(error = %e, "Fatal error");
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    config.init_logging();
    debug!(config = %cli.config.display(), "Configuration loaded");

    let runtime = bootstrap::build(&config).context("failed to start engine")?;
    cli::execute(cli, &config, runtime).await?;
    Ok(())
}
