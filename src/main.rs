mod cli;
mod commands;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_analyze, run_scan};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Scan {
            page,
            endpoint,
            output,
            format,
        } => run_scan(args.config.as_deref(), page, endpoint, output, format).await,
        Commands::Analyze { input, format } => run_analyze(&input, format),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ais=debug" } else { "ais=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
