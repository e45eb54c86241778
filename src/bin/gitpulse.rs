// gitpulse binary entry point

use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    gitpulse::cli::main().await
}
