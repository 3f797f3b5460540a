use clap::Parser;
use nxgenie::cli::{Cli, init_tracing};
use nxgenie::config::Config;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {e}");
        return ExitCode::FAILURE;
    }
    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; enter a key in the sidebar before processing");
    }

    match nxgenie::web::serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
