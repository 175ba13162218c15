use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitValueArg {
    /// Fill missing rows with 0x00.
    #[value(name = "0")]
    Zero,
    /// Fill missing rows with 0xFF.
    #[value(name = "1")]
    One,
}

#[derive(Parser)]
#[command(name = "cyacd2bin")]
#[command(about = "Convert CYACD bootloader files into flat binary flash images")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a CYACD file into a binary image (one image per array, concatenated).
    Convert(ConvertArgs),
}

#[derive(Parser)]
pub struct ConvertArgs {
    /// Input CYACD file.
    pub input: PathBuf,

    /// Output binary file (default: <INPUT>.bin).
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Used to fill flash rows not present in the CYACD file.
    #[arg(long, value_enum, default_value_t = BitValueArg::Zero)]
    pub default_bit_value: BitValueArg,

    /// Fail when a row appears more than once instead of keeping the last one.
    #[arg(long)]
    pub deny_duplicate_rows: bool,

    /// Fail when the header declares a checksum type other than 2's complement.
    #[arg(long)]
    pub strict_checksum_type: bool,

    /// Decode and validate the input without writing the output.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit JSON line events to stdout.
    #[arg(long)]
    pub json: bool,

    /// Reduce output (only errors).
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More output to stderr.
    #[arg(long, short)]
    pub verbose: bool,
}
