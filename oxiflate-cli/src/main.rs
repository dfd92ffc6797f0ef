//! OxiFlate CLI - zlib compression from the command line
//!
//! Compresses files into zlib (or raw DEFLATE) streams, restores them, checks
//! their integrity and shows header details.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use commands::{
    CompressOptions, DecompressOptions, cmd_compress, cmd_decompress, cmd_info, cmd_test,
};
use oxiflate_core::Strategy;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oxiflate")]
#[command(author, version, about = "Pure Rust zlib/DEFLATE compression utility")]
#[command(long_about = "
OxiFlate compresses files into zlib streams (RFC 1950) or raw DEFLATE
(RFC 1951). Compressed files get a .zz suffix.

Examples:
  oxiflate compress notes.txt
  oxiflate compress -l 9 -k *.log
  oxiflate compress --raw --strategy filtered image.bin
  oxiflate decompress notes.txt.zz
  oxiflate test backup.zz
  oxiflate info --json backup.zz
")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress files to <file>.zz
    #[command(alias = "c")]
    Compress {
        /// Files to compress
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Compression level (0 = store, 9 = best)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Write raw DEFLATE without the zlib header and trailer
        #[arg(long)]
        raw: bool,

        /// Match-finding strategy
        #[arg(short, long, value_enum, default_value = "default")]
        strategy: StrategyArg,

        /// Output file, or directory when compressing several files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the input files
        #[arg(short, long)]
        keep: bool,

        /// Overwrite existing output files
        #[arg(short, long)]
        force: bool,

        /// Show a progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress .zz files
    #[command(alias = "d")]
    Decompress {
        /// Files to decompress
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Input is raw DEFLATE without the zlib header and trailer
        #[arg(long)]
        raw: bool,

        /// Output file, or directory when decompressing several files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the input files
        #[arg(short, long)]
        keep: bool,

        /// Overwrite existing output files
        #[arg(short, long)]
        force: bool,

        /// Show a progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Test compressed file integrity
    #[command(alias = "t")]
    Test {
        /// Files to test
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Input is raw DEFLATE without the zlib header and trailer
        #[arg(long)]
        raw: bool,
    },

    /// Show information about a zlib stream
    #[command(alias = "i")]
    Info {
        /// File to inspect
        file: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

/// Match-finding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
enum StrategyArg {
    /// Hash-chain matching with lazy evaluation
    #[default]
    Default,
    /// Favour literals over short matches (filtered numeric data)
    Filtered,
    /// No string matching, Huffman coding only
    HuffmanOnly,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Default => Strategy::Default,
            StrategyArg::Filtered => Strategy::Filtered,
            StrategyArg::HuffmanOnly => Strategy::HuffmanOnly,
        }
    }
}

/// Install the log subscriber; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            files,
            level,
            raw,
            strategy,
            output,
            keep,
            force,
            progress,
        } => cmd_compress(
            &files,
            &CompressOptions {
                level,
                raw,
                strategy: strategy.into(),
                output,
                keep,
                force,
                progress,
            },
        ),
        Commands::Decompress {
            files,
            raw,
            output,
            keep,
            force,
            progress,
        } => cmd_decompress(
            &files,
            &DecompressOptions {
                raw,
                output,
                keep,
                force,
                progress,
            },
        ),
        Commands::Test { files, raw } => cmd_test(&files, raw),
        Commands::Info { file, json } => cmd_info(&file, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compress() {
        let cli = Cli::parse_from([
            "oxiflate", "-vv", "c", "-l", "9", "--strategy", "huffman-only", "-k", "a.txt", "b.txt",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Compress {
                files,
                level,
                strategy,
                keep,
                raw,
                ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(level, 9);
                assert_eq!(Strategy::from(strategy), Strategy::HuffmanOnly);
                assert!(keep);
                assert!(!raw);
            }
            _ => panic!("expected compress"),
        }
    }

    #[test]
    fn test_level_out_of_range() {
        assert!(Cli::try_parse_from(["oxiflate", "compress", "-l", "10", "a"]).is_err());
    }

    #[test]
    fn test_files_required() {
        assert!(Cli::try_parse_from(["oxiflate", "decompress"]).is_err());
    }
}
