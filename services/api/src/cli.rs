use crate::demo::{
    run_applicability, run_catalog_validation, run_demo, ApplicabilityArgs, CatalogValidateArgs,
    DemoArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use grc_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "GRC Assessment Engine",
    about = "Run and explore the compliance applicability and scoring service from the command line",
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
    /// Evaluate an organization profile against the catalog and print the applicability matrix
    Applicability(ApplicabilityArgs),
    /// Reference catalog maintenance
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Run an end-to-end walkthrough: onboarding, evidence, scoring, report and closure
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Load a catalog CSV export and report validation results
    Validate(CatalogValidateArgs),
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
        Command::Applicability(args) => run_applicability(args),
        Command::Catalog {
            command: CatalogCommand::Validate(args),
        } => run_catalog_validation(args),
        Command::Demo(args) => run_demo(args),
    }
}
