use crate::demo::{run_demo, run_service_catalogue, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use sevis_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "SEVIS Portal",
    about = "Run the SEVIS citizen services portal or exercise its workflows from the command line",
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
    /// List the services citizens can apply for, with their reference prefixes
    Services,
    /// Run an end-to-end CLI demo covering intake, vetting, and approval
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
        Command::Services => run_service_catalogue(),
        Command::Demo(args) => run_demo(args),
    }
}
