use cyacd2bin::operation::ConversionEvent;

use crate::cli;

pub mod human;
pub mod json;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub output: String,
    pub arrays: usize,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DryRunSummary {
    pub output: String,
    pub arrays: usize,
    pub records: usize,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
pub enum Event {
    Conversion(ConversionEvent),
    Summary(ConversionSummary),
    DryRun(DryRunSummary),
    Error { code: i32, message: String },
}

pub trait Reporter {
    fn emit(&mut self, event: Event);
    fn finish(&mut self);
}

pub fn make_for_convert(args: &cli::ConvertArgs) -> Box<dyn Reporter> {
    let opts = OutputOptions {
        verbose: args.verbose,
        quiet: args.quiet,
    };
    if args.json {
        Box::new(json::JsonOutput::new(opts))
    } else {
        Box::new(human::HumanOutput::new(opts))
    }
}

/// "Found 2 flash arrays, each containing 256 rows with 128 bytes each."
pub fn format_memory_summary(arrays: usize, rows: usize, row_width: usize) -> String {
    let plural = if arrays > 1 { "s, each" } else { "," };
    format!(
        "Found {arrays} flash array{plural} containing {rows} rows with {row_width} bytes each."
    )
}
