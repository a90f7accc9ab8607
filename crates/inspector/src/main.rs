mod cli;
mod config;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    //  Logging (stderr: stdout carries the JSON report)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,jubamodel=info,jubatus_model=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();

    match args.command {
        cli::Commands::Info(info_args) => cli::info::execute(args.global, info_args).await,
        cli::Commands::Config(c) => cli::config_cmd::execute(c).await,
    }
}
