use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = billing_app::Cli::parse();
    match billing_app::run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("billing_export: {err:#}");
            ExitCode::FAILURE
        }
    }
}
