use std::process::ExitCode;

fn main() -> ExitCode {
    match rdbview::cli::run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
