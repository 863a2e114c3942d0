use std::process::ExitCode;

use someip_gateway::someipd::run_someipd;

fn main() -> ExitCode {
    match run_someipd() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(&error),
    }
}

fn report(error: &dyn std::error::Error) -> ExitCode {
    tracing::error!(target: "someipd", %error, "someipd failed");
    // Startup can fail before telemetry is installed.
    eprintln!("someipd: {error}");
    ExitCode::FAILURE
}
