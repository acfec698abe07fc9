use crate::demo::{run_demo, run_import, run_score, run_template, DemoArgs, ImportArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use nutriscreen::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Nutrition Screening Service",
    about = "Score nutrition screenings and import screening CSV files from the command line",
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
    /// Compute a risk score for a single subject
    Score(ScoreArgs),
    /// Import a screening CSV file into an in-memory store and print the report
    Import(ImportArgs),
    /// Print the CSV import template
    Template,
    /// Import the template twice to show scoring and duplicate handling
    Demo(DemoArgs),
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
        Command::Score(args) => run_score(args),
        Command::Import(args) => run_import(args),
        Command::Template => run_template(),
        Command::Demo(args) => run_demo(args),
    }
}
