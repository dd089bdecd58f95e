use crate::demo::{run_analyze, run_cci_export, AnalyzeArgs, CciExportArgs};
use crate::server;
use aqlhr_insights::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "AqlHR Insights",
    about = "Run the AqlHR workforce insight service or its one-shot commands",
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
    /// Cross-module workforce insights
    Insights {
        #[command(subcommand)]
        command: InsightsCommand,
    },
    /// Corporate culture survey exports
    Cci {
        #[command(subcommand)]
        command: CciCommand,
    },
}

#[derive(Subcommand, Debug)]
enum InsightsCommand {
    /// Run one analysis cycle against the demo dataset and print it
    Analyze(AnalyzeArgs),
}

#[derive(Subcommand, Debug)]
enum CciCommand {
    /// Export the demo culture wave as CSV, PDF or PPTX
    Export(CciExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
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
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Insights {
            command: InsightsCommand::Analyze(args),
        } => run_analyze(args),
        Command::Cci {
            command: CciCommand::Export(args),
        } => run_cci_export(args),
    }
}
