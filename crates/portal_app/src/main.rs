use clap::Parser;
use portal_app::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    portal_app::run(Cli::parse()).await
}
