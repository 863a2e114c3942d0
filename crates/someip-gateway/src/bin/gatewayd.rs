use std::process::ExitCode;

use someip_gateway::gatewayd::run_gatewayd;

fn main() -> ExitCode {
    match run_gatewayd() {
        Ok(_summary) => ExitCode::SUCCESS,
        Err(error) => report(&error),
    }
}

fn report(error: &dyn std::error::Error) -> ExitCode {
    tracing::error!(target: "gatewayd", %error, "gatewayd failed");
    // Startup can fail before telemetry is installed.
    eprintln!("gatewayd: {error}");
    ExitCode::FAILURE
}
