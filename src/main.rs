use anyhow::Result;
use clap::Parser;
use til_agent_rs::cli;
use til_agent_rs::generator::workflow::launch;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = args.into_config();

    launch(&config).await
}
