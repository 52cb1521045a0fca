use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use apk_harvester::cli::{self, Arguments};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Arguments::parse();
    cli::run(args).await
}
