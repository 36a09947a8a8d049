use anyhow::Result;
use clap::{Parser, Subcommand};
use sniffer_cli::commands::{analyze, baud, checksum, packets, stats};
use sniffer_cli::{DirectionArg, InputFormatArg, InputOptions};
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "serialsniffer")]
#[command(about = "SerialSniffer - Packet and checksum inference for serial captures", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Capture format (default: guessed from the file extension)
    #[arg(long, value_enum, global = true)]
    format: Option<InputFormatArg>,

    /// Synthetic spacing between raw bytes, in microseconds
    #[arg(long, default_value_t = 0, global = true)]
    byte_interval_us: u64,

    /// Only analyse bytes seen in this direction
    #[arg(long, value_enum, global = true)]
    direction: Option<DirectionArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a capture for checksum-validated windows
    Checksum(checksum::ChecksumArgs),

    /// Infer packet boundaries
    Packets(packets::PacketsArgs),

    /// Summarise a capture
    Stats(stats::StatsArgs),

    /// Analyse several captures in parallel
    Analyze(analyze::AnalyzeArgs),

    /// Detect the baud rate from signal edge timestamps
    Baud(baud::BaudArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let input = InputOptions {
        format: cli.format,
        byte_interval_us: cli.byte_interval_us,
        direction: cli.direction,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Execute command
    match &cli.command {
        Commands::Checksum(args) => checksum::execute(args, &input, &mut out),
        Commands::Packets(args) => packets::execute(args, &input, &mut out),
        Commands::Stats(args) => stats::execute(args, &input, &mut out),
        Commands::Analyze(args) => analyze::execute(args, &input, &mut out),
        Commands::Baud(args) => baud::execute(args, &mut out),
    }
}
