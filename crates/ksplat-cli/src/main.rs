/// ksplat command-line tool: inspect, validate, stream and convert splat
/// scene files.
///
/// # Command overview
///
/// ```text
/// ksplat <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print the file header and the section-header table
///   validate   Decode a .ksplat file in one shot and report the result
///   stream     Load a file progressively and print every tick
///   convert    Turn raw .splat rows into a level-0 .ksplat file
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Debug logging on stderr (RUST_LOG overrides)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                 |
/// |------|-----------------------------------------|
/// | 0    | Success                                 |
/// | 1    | Error (I/O failure, invalid file, etc.) |
///
/// All error details are written to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_convert;
mod cmd_inspect;
mod cmd_stream;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ksplat", version, about = "Progressive splat scene loader CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print the header and section-header table of a .ksplat file.
    Inspect(InspectArgs),
    /// Decode a .ksplat file and report whether it is well formed.
    Validate(ValidateArgs),
    /// Load a .ksplat or .splat file progressively, printing each tick.
    Stream(StreamArgs),
    /// Convert raw .splat rows into a level-0 .ksplat file.
    Convert(ConvertArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `ksplat inspect`.
///
/// Only the header and the section-header table are read, so a file whose
/// payload is truncated can still be inspected.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the `.ksplat` file.
    pub file: PathBuf,

    /// Print a JSON document instead of the text table.
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the `.ksplat` file to validate.
    pub file: PathBuf,
}

/// Arguments for `ksplat stream`.
///
/// ```text
/// ┌───────────────┬──────────────────────────────────────────────────┐
/// │ Flag          │ Effect                                           │
/// ├───────────────┼──────────────────────────────────────────────────┤
/// │ --chunk-size  │ Bytes per transport chunk (default 65536)        │
/// │ --granularity │ New bytes needed before a tick does work         │
/// │ --delay-ms    │ Delay between ticks in milliseconds (default 15) │
/// │ --raw         │ Treat the input as .splat rows                   │
/// └───────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// Files ending in `.splat` are loaded as raw rows even without `--raw`.
#[derive(clap::Args)]
pub struct StreamArgs {
    pub file: PathBuf,

    #[arg(long, default_value_t = 64 * 1024)]
    pub chunk_size: usize,

    #[arg(long, default_value_t = ksplat_decoder::DEFAULT_STREAMING_GRANULARITY)]
    pub granularity: usize,

    #[arg(long, default_value_t = 15)]
    pub delay_ms: u64,

    #[arg(long)]
    pub raw: bool,
}

/// Arguments for `ksplat convert`.
#[derive(clap::Args)]
pub struct ConvertArgs {
    /// Raw `.splat` input (32 bytes per row).
    pub input: PathBuf,

    /// Output `.ksplat` file path.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Rows with a lower alpha are dropped.
    #[arg(long, default_value_t = 1)]
    pub min_alpha: u8,

    /// Maximum splats per section (0 writes a single section).
    #[arg(long, default_value_t = 0)]
    pub section_size: usize,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
        Commands::Stream(args) => cmd_stream::run(&args),
        Commands::Convert(args) => cmd_convert::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
