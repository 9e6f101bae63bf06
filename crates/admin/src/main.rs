//! ICYXR Admin - staff terminal console.
//!
//! # Commands
//!
//! - `console` - watch the waiting list, claim a session and chat
//! - `users` / `ban` / `promote` - moderation
//! - `orders list|approve|deny` - order review
//! - `announce` / `site toggle` - banner text and open/closed switch
//!
//! The acting admin is `ADMIN_USER_ID`; the database is
//! `REALTIME_DATABASE_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stderr)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use icyxr_admin::config::AdminConfig;
use icyxr_admin::error::{AppError, set_sentry_user};
use icyxr_admin::state::AdminContext;
use icyxr_admin::terminal;
use icyxr_realtime::RestStore;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "icyxr-admin")]
#[command(about = "ICYXR 3D Printing staff console")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work the live support queue
    Console,
    /// List users other than yourself
    Users,
    /// Find users by name or email
    Search {
        /// Text to look for, ignoring case
        query: String,
    },
    /// Ban a user
    Ban {
        /// User ID
        user: String,
        /// Why the user is banned
        reason: String,
    },
    /// Send a promotion notice to the account with this email
    Promote {
        email: String,
        message: String,
    },
    /// Review orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Set the announcement banner
    Announce {
        text: String,
    },
    /// Store open/closed switch
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List all orders, newest first
    List,
    /// Approve a pending order
    Approve { id: String },
    /// Deny a pending order
    Deny { id: String },
}

#[derive(Subcommand)]
enum SiteAction {
    /// Open the store if closed, close it if open
    Toggle,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
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

    let config = match AdminConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "icyxr_admin=info,icyxr_realtime=warn".into());

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

async fn run(command: Commands, config: &AdminConfig) -> Result<(), AppError> {
    let store = RestStore::new(&config.realtime)?;
    set_sentry_user(&config.identity.user_id);
    let ctx = AdminContext::new(store, config.identity.clone());
    tracing::info!(admin = %ctx.identity().display_name, "admin console started");

    match command {
        Commands::Console => terminal::run_console(&ctx, shutdown_signal()).await,
        Commands::Users => terminal::run_users(&ctx).await,
        Commands::Search { query } => terminal::run_search(&ctx, &query).await,
        Commands::Ban { user, reason } => terminal::run_ban(&ctx, &user, &reason).await,
        Commands::Promote { email, message } => terminal::run_promote(&ctx, &email, &message).await,
        Commands::Orders { action } => match action {
            OrderAction::List => terminal::run_orders_list(&ctx).await,
            OrderAction::Approve { id } => terminal::run_decide(&ctx, &id, true).await,
            OrderAction::Deny { id } => terminal::run_decide(&ctx, &id, false).await,
        },
        Commands::Announce { text } => terminal::run_announce(&ctx, &text).await,
        Commands::Site {
            action: SiteAction::Toggle,
        } => terminal::run_site_toggle(&ctx).await,
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
