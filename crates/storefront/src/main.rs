//! ICYXR Storefront - customer terminal client.
//!
//! # Commands
//!
//! - `chat` - bot prelude, then a live support session with an admin
//! - `inbox` - show and clear notifications as they arrive
//! - `prices` / `order` - price list and order placement
//! - `banner` - store status and announcement
//! - `profile` - display name, with optional rename
//!
//! Everything talks to the hosted realtime database configured in the
//! environment. Signed-in identity comes from `STOREFRONT_USER_ID`; without
//! it the customer is a guest.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stderr)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use icyxr_realtime::RestStore;
use icyxr_storefront::config::StorefrontConfig;
use icyxr_storefront::error::{AppError, set_sentry_user};
use icyxr_storefront::state::AppContext;
use icyxr_storefront::terminal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "icyxr-storefront")]
#[command(about = "ICYXR 3D Printing storefront")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the support bot and, on request, a person
    Chat,
    /// Show notifications as they arrive, deleting each once shown
    Inbox,
    /// Print the price list
    Prices {
        /// Show prices with the discount applied
        #[arg(long)]
        discounted: bool,
    },
    /// Place an order
    Order {
        /// Item number from the price list
        item: usize,
        /// Discount code
        #[arg(long)]
        code: Option<String>,
    },
    /// Print the store banner
    Banner {
        /// Keep printing on every change
        #[arg(long)]
        watch: bool,
    },
    /// Print how many members the store has
    Members {
        /// Keep printing on every change
        #[arg(long)]
        watch: bool,
    },
    /// Show or change your display name
    Profile {
        /// New display name
        #[arg(long)]
        rename: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
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
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to warn so log lines do not interleave with the chat
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "icyxr_storefront=warn,icyxr_realtime=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &StorefrontConfig) -> Result<(), AppError> {
    let store = RestStore::new(&config.realtime)?;
    let customer = config.identity.customer();
    set_sentry_user(customer.id(), customer.email().map(icyxr_core::Email::as_str));
    let ctx = AppContext::new(store, customer);

    match command {
        Commands::Chat => terminal::run_chat(&ctx, shutdown_signal()).await,
        Commands::Inbox => terminal::run_inbox(&ctx, shutdown_signal()).await,
        Commands::Prices { discounted } => {
            terminal::print_catalog(discounted);
            Ok(())
        }
        Commands::Order { item, code } => terminal::run_order(&ctx, item, code.as_deref()).await,
        Commands::Banner { watch } => terminal::run_banner(&ctx, watch, shutdown_signal()).await,
        Commands::Members { watch } => terminal::run_user_count(&ctx, watch, shutdown_signal()).await,
        Commands::Profile { rename } => terminal::run_profile(&ctx, rename.as_deref()).await,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
