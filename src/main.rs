//! Binary entry point for finreport-rs.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use finreport_rs::cli::output::format_error;
use finreport_rs::cli::{execute, Cli};
use std::io::{self, Write};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format;

    match execute(&cli).await {
        Ok(output) => {
            if !output.is_empty() {
                if let Err(e) = writeln!(io::stdout(), "{output}")
                    && e.kind() != io::ErrorKind::BrokenPipe
                {
                    eprintln!("Error writing to stdout: {e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let error_output = format_error(&e, format);
            eprintln!("{error_output}");
            ExitCode::FAILURE
        }
    }
}
