pub mod config_cmd;
pub mod info;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "jubamodel",
    version,
    about = "Inspect the headers of Jubatus model files"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
pub struct GlobalArgs {
    /// Accept files whose magic bytes do not identify a Jubatus model.
    #[arg(long, global = true, env = "JUBAMODEL_PERMISSIVE")]
    pub permissive: bool,

    /// Keep going past unreadable files and report them at the end.
    #[arg(long = "best-effort", global = true, env = "JUBAMODEL_BEST_EFFORT")]
    pub best_effort: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the header of each model file as JSON.
    Info(InfoArgs),

    /// View / edit configuration.
    Config(ConfigArgs),
}

//  Subcommand argument structs

#[derive(Debug, clap::Args, Clone)]
pub struct InfoArgs {
    /// Model files to inspect, reported in the given order.
    #[arg(required = true)]
    pub paths: Vec<std::path::PathBuf>,

    /// Emit compact single-line JSON.
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Display the current configuration.
    Show,
    /// Set a configuration value.
    Set { key: String, value: String },
}
