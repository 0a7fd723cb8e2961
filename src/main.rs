use clap::Parser;
use report_console::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "report_console=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run(Cli::parse()).await
}
