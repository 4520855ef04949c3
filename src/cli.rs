use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ais")]
#[command(
    version,
    about = "AI Image Scanner - Find page images and classify them as human-made or AI-generated",
    long_about = "AI Image Scanner (AIS)\n\nModes:\n- scan: process every qualifying image of a page snapshot through the local analyzer and the remote detector.\n- analyze: run the local pixel analyzer on a single image file, no network.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for thresholds/endpoint/pauses; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process every qualifying image of a page snapshot
    Scan {
        #[arg(
            long,
            help = "Page snapshot file: a JSON array of image elements ({id, src, alt, title, width, height})"
        )]
        page: PathBuf,

        #[arg(long, help = "Detection endpoint override")]
        endpoint: Option<String>,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,
    },
    /// Run the local pixel analyzer on a single image file
    Analyze {
        #[arg(help = "Image file to analyze")]
        input: PathBuf,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
