use crate::lookup::{run_datasets, run_query, DatasetsArgs, QueryArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use cutoff_finder::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Cutoff Finder",
    about = "Find the college programs an exam rank qualifies for across counselling years",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Classify programs for a rank and print the recommended views
    Query(QueryArgs),
    /// List the cutoff tables found in the data directory
    Datasets(DatasetsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the directory holding per-tier cutoff tables
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Query(args) => run_query(args),
        Command::Datasets(args) => run_datasets(args),
    }
}
