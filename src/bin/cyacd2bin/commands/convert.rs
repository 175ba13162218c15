use cyacd2bin::api;
use cyacd2bin::image::FillByte;

use crate::cli;
use crate::exit_codes;
use crate::output::{ConversionSummary, DryRunSummary, Event, Reporter};

pub fn run(args: cli::ConvertArgs, out: &mut dyn Reporter) -> i32 {
    let opts = api::ConvertOptions {
        output: args.output.clone(),
        fill: FillByte::from_bit(args.default_bit_value == cli::BitValueArg::One),
        deny_duplicate_rows: args.deny_duplicate_rows,
        strict_checksum_type: args.strict_checksum_type,
    };

    if args.dry_run {
        return dry_run(&args, &opts, out);
    }

    let r = api::convert_file(&args.input, &opts, |ev| out.emit(Event::Conversion(ev)));
    match r {
        Ok(report) => {
            out.emit(Event::Summary(ConversionSummary {
                output: report.output.display().to_string(),
                arrays: report.arrays,
                bytes: report.bytes,
            }));
            exit_codes::EXIT_OK
        }
        Err(e) => fail(&e, out),
    }
}

fn dry_run(args: &cli::ConvertArgs, opts: &api::ConvertOptions, out: &mut dyn Reporter) -> i32 {
    let r = api::plan_conversion(&args.input, opts, |ev| out.emit(Event::Conversion(ev)));
    match r {
        Ok(plan) => {
            out.emit(Event::DryRun(DryRunSummary {
                output: plan.output.display().to_string(),
                arrays: plan.arrays.len(),
                records: plan.records,
                bytes: plan.image_len(),
            }));
            exit_codes::EXIT_OK
        }
        Err(e) => fail(&e, out),
    }
}

fn fail(e: &api::ConvertError, out: &mut dyn Reporter) -> i32 {
    let code = map_convert_error(e);
    out.emit(Event::Error {
        code,
        message: e.to_string(),
    });
    code
}

fn map_convert_error(e: &api::ConvertError) -> i32 {
    match e.kind() {
        api::ConvertErrorKind::MalformedHeader
        | api::ConvertErrorKind::MalformedRecord
        | api::ConvertErrorKind::ChecksumMismatch
        | api::ConvertErrorKind::EmptyArray
        | api::ConvertErrorKind::InvalidLayout => exit_codes::EXIT_INVALID_INPUT,
        api::ConvertErrorKind::SameInputOutputFile => exit_codes::EXIT_SAME_FILE,
        api::ConvertErrorKind::Io => match e {
            api::ConvertError::Write { .. } => exit_codes::EXIT_WRITE_FAILED,
            _ => exit_codes::EXIT_UNEXPECTED,
        },
    }
}
