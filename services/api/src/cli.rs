use crate::commands::{
    run_configure, run_init, run_issue_export, run_issue_list, run_issue_report, run_issue_stats,
    ConfigureArgs, InitArgs, IssueExportArgs, IssueListArgs, IssueReportArgs,
};
use crate::server;
use civic_core::config::{AppConfig, StorageConfig};
use civic_core::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "blackroad-citizen-app",
    about = "Provision and run the BlackRoad citizen engagement platform for a city",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the city profile and database in the data directory
    Init(InitArgs),
    /// Choose which civic modules the city enables
    Configure(ConfigureArgs),
    /// Start the HTTP gateway (default command)
    Deploy(DeployArgs),
    /// Report, list and summarize 311 issues from the terminal
    Issues {
        #[command(subcommand)]
        command: IssuesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum IssuesCommand {
    /// File a new issue report or permit application
    Report(IssueReportArgs),
    /// List issues, most supported first by default
    List(IssueListArgs),
    /// Print totals, average support and per-category counts
    Stats,
    /// Export statistics and every issue as JSON
    Export(IssueExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct DeployArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Deploy(DeployArgs::default()));

    match command {
        Command::Deploy(args) => server::run(args).await,
        Command::Init(args) => run_init(&storage()?, args).await.map(drop),
        Command::Configure(args) => run_configure(&storage()?, args).map(drop),
        Command::Issues { command } => {
            let storage = storage()?;
            match command {
                IssuesCommand::Report(args) => run_issue_report(&storage, args).await,
                IssuesCommand::List(args) => run_issue_list(&storage, args).await,
                IssuesCommand::Stats => run_issue_stats(&storage).await,
                IssuesCommand::Export(args) => run_issue_export(&storage, args).await,
            }
        }
    }
}

fn storage() -> Result<StorageConfig, AppError> {
    Ok(AppConfig::load()?.storage)
}
