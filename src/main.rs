//! pricing-recorder - record distributor pricing and stock
//!
//! Fetches manufacturer listings from the portal and writes CSV or JSON.

use anyhow::Result;
use clap::Parser;
use pricing_recorder::commands::{CollectCommand, CollectOptions};
use pricing_recorder::config::{Config, Credentials, OutputFormat};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pricing-recorder",
    version,
    about = "Record pricing data from 21stcenturydist.com",
    long_about = "Logs into the 21st Century Distributing portal, fetches manufacturer listing pages, \
                  and writes item pricing, stock, and branch inventory to CSV or JSON."
)]
struct Cli {
    /// Manufacturer name(s) to capture
    #[arg(required = true)]
    manufacturers: Vec<String>,

    /// Account email
    #[arg(long, env = "CENTURY21_EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(long, env = "CENTURY21_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Output file format (csv, json)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Skip the login request; prices will be blank
    #[arg(long)]
    skip_login: bool,

    /// Override the portal base URL
    #[arg(long, env = "CENTURY21_BASE_URL")]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Delay between requests in milliseconds
    #[arg(long)]
    delay: Option<u64>,

    /// Maximum listing pages per manufacturer
    #[arg(long)]
    max_pages: Option<u32>,

    /// Also save each manufacturer's PDF price sheet into this directory
    #[arg(long)]
    price_sheets: Option<PathBuf>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, env = "CENTURY21_PROXY")]
    proxy: Option<String>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(max_pages) = cli.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }

    let credentials = Credentials::resolve(cli.email.as_deref(), cli.password.as_deref());
    let options = CollectOptions { skip_login: cli.skip_login, price_sheet_dir: cli.price_sheets };
    let format = config.format;

    let cmd = CollectCommand::new(config, credentials, options);
    let collection = cmd.execute(&cli.manufacturers).await?;
    collection.write_output(format, &cli.output)?;

    Ok(())
}
