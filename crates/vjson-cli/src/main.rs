/// VectorJSON command-line tool — parse, classify, inspect and stream
/// JSON with the incremental engine.
///
/// # Command overview
///
/// ```text
/// vjson <COMMAND> [OPTIONS] [FILE]
///
/// Commands:
///   parse      Parse a document and print its (autocompleted) value
///   classify   Print the classifier's status, completion suffix and trim
///   inspect    Dump the token tape, synthetic markers included
///   stream     Feed input chunk by chunk, printing live progress
///   help       Print help information
///
/// FILE defaults to standard input for every command.
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                 |
/// |------|-----------------------------------------|
/// | 0    | Success                                 |
/// | 1    | Error (I/O failure, invalid JSON, etc.) |
///
/// Errors are written to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod cmd_classify;
mod cmd_inspect;
mod cmd_parse;
mod cmd_stream;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vjson", version, about = "Incremental JSON engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Parse a document and print its (autocompleted) value.
    Parse(ParseArgs),
    /// Print the classifier's verdict: status, suffix, trim.
    Classify(ClassifyArgs),
    /// Dump the token tape with synthetic markers.
    Inspect(InspectArgs),
    /// Feed input chunk by chunk, printing live progress and events.
    Stream(StreamArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

#[derive(clap::Args)]
struct ParseArgs {
    /// Input file (defaults to stdin).
    file: Option<PathBuf>,

    /// Demand exactly one value: trailing content becomes an error.
    #[arg(long)]
    single: bool,

    /// Pretty-print the value instead of compact output.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args)]
struct ClassifyArgs {
    /// Input file (defaults to stdin).
    file: Option<PathBuf>,
}

#[derive(clap::Args)]
struct InspectArgs {
    /// Input file (defaults to stdin).
    file: Option<PathBuf>,
}

#[derive(clap::Args)]
struct StreamArgs {
    /// Input file (defaults to stdin).
    file: Option<PathBuf>,

    /// Bytes per feed.
    #[arg(long, default_value_t = 16)]
    chunk: usize,

    /// Paths to report value events for (repeatable).
    #[arg(long)]
    watch: Vec<String>,

    /// Paths to report string deltas for (repeatable).
    #[arg(long)]
    delta: Vec<String>,

    /// Paths to skip entirely (repeatable).
    #[arg(long)]
    skip: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Parse(args) => cmd_parse::run(&args),
        Commands::Classify(args) => cmd_classify::run(&args),
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Stream(args) => cmd_stream::run(&args),
    };
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Read the whole input: the named file, or stdin when absent.
fn read_input(file: Option<&PathBuf>) -> anyhow::Result<Vec<u8>> {
    use std::io::Read;
    match file {
        Some(path) => {
            std::fs::read(path).map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}
