use anyhow::Context;
use clap::Parser;
use mail_test_srv::api::ApiServer;
use mail_test_srv::config::{Config, LoggingConfig};
use mail_test_srv::security::AuthLine;
use mail_test_srv::smtp::SmtpServer;
use mail_test_srv::storage::MailStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "mail-test-srv")]
#[command(about = "Mock SMTP server that records delivered mail", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for the HTTP API, overriding the configuration
    #[arg(long = "http")]
    http_port: Option<u16>,
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mail_test_srv={0},audit={0}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        "compact" => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None if std::path::Path::new("config.toml").exists() => {
            Config::from_file("config.toml").context("Failed to load config.toml")?
        }
        None => Config::default(),
    };

    if let Some(port) = cli.http_port {
        config.set_api_port(port);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_logging(&config.logging);

    info!("Starting mail-test-srv v{}", env!("CARGO_PKG_VERSION"));
    info!("  SMTP listening on: {}", config.smtp.listen_addr);
    info!("  API listening on: {}", config.api.listen_addr);
    info!("  Domain: {}", config.server.domain);

    let auth_line = AuthLine::from_config(&config.smtp).context("Couldn't calculate password")?;
    let storage = Arc::new(MailStore::new());

    let smtp_server = SmtpServer::bind(
        &config.smtp.listen_addr,
        config.server.domain.clone(),
        auth_line,
        Arc::clone(&storage),
    )
    .await
    .context("Couldn't bind for SMTP")?;

    let api_server = ApiServer::bind(&config.api.listen_addr, Arc::clone(&storage))
        .await
        .context("Couldn't start HTTP server")?;

    let smtp_handle = tokio::spawn(smtp_server.run());
    let api_handle = tokio::spawn(api_server.run());

    // Either server stopping is fatal
    tokio::select! {
        result = smtp_handle => {
            match result {
                Ok(Ok(())) => info!("SMTP server exited"),
                Ok(Err(e)) => {
                    error!("SMTP server error: {}", e);
                    return Err(anyhow::Error::new(e).context("Failed to accept connection"));
                }
                Err(e) => anyhow::bail!("SMTP task panic: {}", e),
            }
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => info!("API server exited"),
                Ok(Err(e)) => {
                    error!("API server error: {}", e);
                    return Err(anyhow::Error::new(e).context("HTTP server failed"));
                }
                Err(e) => anyhow::bail!("API task panic: {}", e),
            }
        }
    }

    Ok(())
}
