use std::process;

use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod logging;
mod output;

fn main() {
    logging::init_tracing();

    let cli = cli::Cli::parse();

    let exit_code = match cli.command {
        cli::Command::Convert(args) => {
            let mut out = output::make_for_convert(&args);
            let code = commands::convert::run(args, &mut *out);
            out.finish();
            code
        }
    };

    process::exit(exit_code);
}
