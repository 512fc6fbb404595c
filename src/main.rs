//! prodtrack - Stage tracking for manufacturing and installation projects

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = prodtrack::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
