use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tributary::app::AppContext;
use tributary::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => commands::serve(ctx).await?,
        Commands::Check => commands::check(&ctx)?,
        Commands::Fetch { section } => commands::fetch(&ctx, section.as_deref()).await?,
    }

    Ok(())
}
