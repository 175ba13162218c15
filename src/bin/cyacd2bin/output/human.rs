use cyacd2bin::operation::ConversionEvent;

use crate::output::{
    format_memory_summary, ConversionSummary, DryRunSummary, Event, OutputOptions, Reporter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Quiet,
    Verbose,
    Normal,
}

pub struct HumanOutput {
    opts: OutputOptions,
}

impl HumanOutput {
    pub fn new(opts: OutputOptions) -> Self {
        Self { opts }
    }

    fn mode(&self) -> Mode {
        if self.opts.quiet {
            Mode::Quiet
        } else if self.opts.verbose {
            Mode::Verbose
        } else {
            Mode::Normal
        }
    }

    fn println(&mut self, msg: &str) {
        if self.mode() == Mode::Quiet {
            return;
        }
        eprintln!("{msg}");
    }

    pub(crate) fn conversion_lines(ev: &ConversionEvent, verbose: bool) -> Vec<String> {
        match ev {
            ConversionEvent::HeaderDecoded { header } => vec![
                format!("Silicon ID: 0x{:04X}", header.silicon_id),
                format!("Silicon revision: {}", header.silicon_revision),
                format!("Protocol checksum type: {}", header.checksum_type),
                String::new(),
            ],
            ConversionEvent::ChecksumTypeUnsupported { header } => vec![format!(
                "warning: header declares {}; rows are verified with 2's complement summation",
                header.checksum_type
            )],
            ConversionEvent::DuplicateRow {
                line_no,
                array_id,
                row_id,
            } => vec![format!(
                "warning: line {line_no} overwrites array {array_id} row {row_id}"
            )],
            ConversionEvent::MemoryAssembled {
                arrays,
                records,
                first,
            } => {
                let mut lines = Vec::new();
                if verbose {
                    lines.push(format!("decoded {records} rows"));
                }
                if let Some(layout) = first {
                    lines.push(format_memory_summary(
                        *arrays,
                        layout.row_count,
                        layout.row_width,
                    ));
                }
                lines
            }
            ConversionEvent::ArrayStart {
                array_id,
                layout,
                present_rows,
            } => {
                let mut lines = vec![format!("Array {array_id}: Present rows {present_rows}")];
                if verbose {
                    lines.push(format!(
                        "  {} rows x {} bytes, {} filled",
                        layout.row_count,
                        layout.row_width,
                        layout.missing_rows()
                    ));
                }
                lines
            }
            ConversionEvent::ArrayWritten { array_id, bytes } => {
                if verbose {
                    vec![format!("  array {array_id}: {bytes} bytes")]
                } else {
                    Vec::new()
                }
            }
            ConversionEvent::Done { output, .. } => {
                vec![format!("Flash memory written to {}", output.display())]
            }
        }
    }
}

impl Reporter for HumanOutput {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Conversion(ev) => {
                let verbose = self.mode() == Mode::Verbose;
                for line in Self::conversion_lines(&ev, verbose) {
                    self.println(&line);
                }
            }
            Event::Summary(summary) => emit_summary(summary, self),
            Event::DryRun(summary) => emit_dry_run(summary, self),
            Event::Error { code: _, message } => {
                eprintln!("error: {message}");
            }
        }
    }

    fn finish(&mut self) {}
}

fn emit_summary(summary: ConversionSummary, out: &mut HumanOutput) {
    if out.mode() != Mode::Verbose {
        return;
    }
    out.println(&format!(
        "{} bytes from {} array(s) -> {}",
        summary.bytes, summary.arrays, summary.output
    ));
}

fn emit_dry_run(summary: DryRunSummary, out: &mut HumanOutput) {
    if out.mode() == Mode::Quiet {
        return;
    }

    out.println("Dry run OK");
    out.println(&format!(
        "Image: {} bytes from {} array(s), {} rows decoded",
        summary.bytes, summary.arrays, summary.records
    ));
    out.println(&format!("Would write: {}", summary.output));
}
