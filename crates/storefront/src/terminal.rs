//! Line-oriented terminal front end for the storefront.
//!
//! Each command runs until it finishes or the shutdown future resolves.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::collections::HashSet;
use std::future::Future;

use icyxr_core::RealtimeStore;
use icyxr_core::models::Notification;
use icyxr_core::ordering::{Attribution, RenderedMessage};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::catalog::{Basket, catalog, final_price};
use crate::services::inbox::subscribe_and_consume;
use crate::services::profile::{ProfileEvent, ProfileWatcher, rename};
use crate::services::site::{SiteWatcher, UserCountWatcher};
use crate::state::AppContext;
use crate::support::SupportView;

/// Prints the support conversation to stdout.
///
/// The client re-renders the whole conversation on every change; only
/// messages not printed yet are written.
#[derive(Debug, Default)]
pub struct TerminalView {
    printed: HashSet<String>,
}

impl TerminalView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SupportView for TerminalView {
    fn show_bot_message(&mut self, text: &str) {
        println!("[bot] {text}");
    }

    fn show_waiting(&mut self) {
        println!("... waiting for an admin");
    }

    fn show_connected(&mut self) {
        println!("--- live chat ---");
    }

    fn render_messages(&mut self, messages: &[RenderedMessage]) {
        for message in messages {
            if !self.printed.insert(message.key.to_string()) {
                continue;
            }
            let who = match message.attribution {
                Attribution::Own => "you",
                Attribution::Other => message.sender_display_name.as_str(),
            };
            println!(
                "[{}] {who}: {}",
                message.sent_at.format("%H:%M"),
                message.text
            );
        }
    }

    fn show_ended(&mut self) {
        println!("--- chat ended (type yes to start again, /quit to leave) ---");
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("! {message}");
    }

    fn reset(&mut self) {
        self.printed.clear();
    }
}

fn is_affirmative(line: &str) -> bool {
    matches!(line.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Interactive support chat on stdin/stdout.
///
/// # Errors
///
/// Returns `AppError::Io` if stdin cannot be read. Store failures are shown
/// and the loop carries on.
pub async fn run_chat<S, F>(ctx: &AppContext<S>, shutdown: F) -> Result<()>
where
    S: RealtimeStore,
    F: Future<Output = ()>,
{
    let customer = ctx.customer().clone();
    let mut client = ctx.support_client(TerminalView::new());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::pin!(shutdown);

    client.open();
    println!("(type yes to talk to a person, /quit to leave)");

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            update = client.next_update(), if client.is_listening() => {
                if let Err(e) = update {
                    report(client.view_mut(), &e.into());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "/quit" {
                    break;
                }

                if let Some(session_id) = client.session_id().cloned().filter(|_| client.input_enabled()) {
                    if let Err(e) = client.send_message(&session_id, line).await {
                        report(client.view_mut(), &e.into());
                    }
                } else if client.is_listening() {
                    client.view_mut().show_bot_message("Still waiting for an admin...");
                } else if is_affirmative(line) {
                    add_breadcrumb("support", "requested live session");
                    client.view_mut().reset();
                    if let Err(e) = client
                        .request_session(customer.id().clone(), customer.display_name(), customer.contact())
                        .await
                    {
                        report(client.view_mut(), &e.into());
                    }
                }
            }
        }
    }

    client.close_local_session();
    Ok(())
}

fn report<V: SupportView>(view: &mut V, error: &AppError) {
    error.report();
    view.show_error(&error.user_message());
}

fn print_notification(notification: &Notification) {
    println!("[notification] {}", notification.message);
}

/// Print and delete notifications as they arrive.
///
/// # Errors
///
/// Returns `AppError::Support` if the queue cannot be read or cleared.
pub async fn run_inbox<S, F>(ctx: &AppContext<S>, shutdown: F) -> Result<()>
where
    S: RealtimeStore,
    F: Future<Output = ()>,
{
    let consume = subscribe_and_consume(
        ctx.store().clone(),
        ctx.customer().id().clone(),
        print_notification,
    );
    tokio::select! {
        () = shutdown => Ok(()),
        result = consume => result.map_err(AppError::from),
    }
}

/// Print the price list.
pub fn print_catalog(discount_active: bool) {
    for (index, item) in catalog().iter().enumerate() {
        println!(
            "{}. {} - {} ({})",
            index + 1,
            item.name,
            final_price(item, discount_active),
            item.print_time
        );
    }
}

/// Place an order for item `number` (1-based), optionally with a discount code.
///
/// # Errors
///
/// Returns `AppError::Order` if the item or code is wrong, the store is
/// closed, or the write fails.
pub async fn run_order<S: RealtimeStore>(
    ctx: &AppContext<S>,
    number: usize,
    code: Option<&str>,
) -> Result<()> {
    let mut basket = Basket::new();
    basket.toggle(number.saturating_sub(1))?;
    if let Some(code) = code {
        basket.redeem(code)?;
        println!("Discount applied.");
    }

    let order_id = ctx.orders().checkout(ctx.customer(), &basket).await?;
    add_breadcrumb("orders", "order placed");
    println!("Order placed ({order_id}). We will be in touch.");
    Ok(())
}

/// Print the banner; with `watch`, keep printing it on every change.
///
/// # Errors
///
/// Returns `AppError::Store` if the listeners cannot be attached.
pub async fn run_banner<S, F>(ctx: &AppContext<S>, watch: bool, shutdown: F) -> Result<()>
where
    S: RealtimeStore,
    F: Future<Output = ()>,
{
    let mut watcher = SiteWatcher::subscribe(ctx.store()).await?;
    tokio::pin!(shutdown);

    // Both documents deliver their current value first.
    let mut initial = 2_u8;
    loop {
        let change = tokio::select! {
            () = &mut shutdown => return Ok(()),
            change = watcher.next_change() => change,
        };
        let Some(change) = change else {
            return Ok(());
        };
        if let Err(e) = change {
            AppError::from(e).report();
        }

        initial = initial.saturating_sub(1);
        if initial == 0 {
            println!("{}", watcher.banner());
            if !watch {
                return Ok(());
            }
        }
    }
}

/// Print how many accounts exist; with `watch`, print again on every change.
///
/// # Errors
///
/// Returns `AppError::Store` if the listener cannot be attached.
pub async fn run_user_count<S, F>(ctx: &AppContext<S>, watch: bool, shutdown: F) -> Result<()>
where
    S: RealtimeStore,
    F: Future<Output = ()>,
{
    let mut watcher = UserCountWatcher::subscribe(ctx.store()).await?;
    tokio::pin!(shutdown);

    loop {
        let count = tokio::select! {
            () = &mut shutdown => break,
            count = watcher.next_count() => count,
        };
        let Some(count) = count else { break };
        println!("{count} members");
        if !watch {
            break;
        }
    }
    watcher.stop();
    Ok(())
}

/// Show the signed-in customer's display name, optionally renaming first.
///
/// # Errors
///
/// Returns `AppError::Profile` for a blank name or a failed write, and
/// `AppError::Store` if the profile cannot be read.
pub async fn run_profile<S: RealtimeStore>(ctx: &AppContext<S>, new_name: Option<&str>) -> Result<()> {
    let customer = ctx.customer();
    if !customer.is_signed_in() {
        println!("Guests have no profile. Sign in to set a display name.");
        return Ok(());
    }

    if let Some(name) = new_name {
        let name = rename(ctx.store(), customer.id(), name).await?;
        println!("Display name changed to {name}.");
        return Ok(());
    }

    let mut watcher =
        ProfileWatcher::subscribe(ctx.store().clone(), customer.id(), customer.email().cloned()).await?;
    let event = watcher.next_event().await.transpose()?;
    watcher.stop();

    match event {
        Some(ProfileEvent::Loaded { name }) => println!("Display name: {name}"),
        Some(ProfileEvent::Created { name } | ProfileEvent::Repaired { name }) => {
            println!("Display name set to {name}.");
        }
        Some(ProfileEvent::Banned { reason }) => {
            println!("You have been banned from ICYXR 3D Printing.");
            println!("Reason: {reason}");
        }
        None => {}
    }
    Ok(())
}
