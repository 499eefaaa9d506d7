mod convert;
mod info;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a VITA 49 packet file to SigMF recordings.
    ///
    /// One recording is written per stream identifier, named after the identifier in
    /// hex, e.g., 0x1f.sigmf-meta and 0x1f.sigmf-data. Signal data packets without a
    /// stream identifier are written to none.sigmf-meta and none.sigmf-data. Existing
    /// recordings with the same names are replaced.
    Convert {
        /// Directory to write recordings to. Created if it does not exist.
        #[arg(short, long, default_value = ".", value_name = "path")]
        output: PathBuf,

        /// Value for core:author
        #[arg(long, default_value = "unknown")]
        author: String,

        /// Value for core:description
        #[arg(long, default_value = "Converted from VITA 49")]
        description: String,

        /// Value for core:hw
        #[arg(long, default_value = "unknown")]
        hw: String,

        /// Write metadata files once after all packets are converted rather than after
        /// every packet.
        #[arg(long, action)]
        defer_meta: bool,

        /// Input VITA 49 packet file.
        input: PathBuf,
    },
    /// Show information about a VITA 49 packet file
    Info {
        /// Input VITA 49 packet file
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("VITA49_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Convert {
            output,
            author,
            description,
            hw,
            defer_meta,
            input,
        } => {
            let opts = vita49::ConvertOptions::builder()
                .output_dir(output)
                .author(author)
                .description(description)
                .hw(hw)
                .defer_metadata(*defer_meta)
                .build();
            convert::convert(input, opts)
        }
        Commands::Info { input, format } => info::info(input, format),
    }
}
