// src/main.rs

use clap::Parser;
use devicebatch::settings::AppSettings;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn,hyper=warn";

#[tokio::main]
async fn main() {
    // A missing .env is fine.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut settings = AppSettings::load();
    if let Some(url) = cli.service_url {
        settings.service_url = url;
    }

    if let Err(e) = cli::dispatch(cli.command, settings).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
