//! Doorstep CLI - Headless driver for the delivery and checkout flow.
//!
//! # Usage
//!
//! ```bash
//! # Check which user the configured credentials belong to
//! doorstep whoami
//!
//! # Save an address and place an order for the items in cart.yaml
//! doorstep checkout --cart cart.yaml \
//!     --street "123 Main St" --city Metropolis --state NY \
//!     --postal-code 10001 --country US
//!
//! # Same, with a confirmed map position
//! doorstep checkout --cart cart.yaml --lat 12.34 --lng 56.78 ...
//! ```
//!
//! # Commands
//!
//! - `whoami` - Check the backend session
//! - `checkout` - Run location selection and order placement end to end
//!
//! Configuration comes from `DOORSTEP_*` environment variables (see
//! `doorstep_checkout::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use doorstep_checkout::ClientConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod headless;

#[derive(Parser)]
#[command(name = "doorstep")]
#[command(author, version, about = "Doorstep delivery and checkout tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the user the backend session belongs to
    Whoami,
    /// Select a delivery location and place an order
    Checkout(commands::checkout::CheckoutArgs),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed for Sentry, which must be initialized before
    // the tracing subscriber
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "doorstep_checkout=info,doorstep_cli=info,doorstep=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Whoami => commands::whoami::run(&config).await?,
        Commands::Checkout(args) => commands::checkout::run(&config, args).await?,
    }
    Ok(())
}
