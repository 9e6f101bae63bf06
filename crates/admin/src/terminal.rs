//! Line-oriented terminal front end for the admin console.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::collections::HashSet;
use std::future::Future;

use icyxr_core::models::ChatSession;
use icyxr_core::ordering::{Attribution, RenderedMessage};
use icyxr_core::{OrderId, RealtimeStore, StoreError, UserId};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{AppError, Result};
use crate::services::{moderation, orders, site};
use crate::state::AdminContext;
use crate::support::ConsoleView;

/// Prints the waiting list and the claimed conversation to stdout.
#[derive(Debug, Default)]
pub struct TerminalConsoleView {
    printed: HashSet<String>,
}

impl TerminalConsoleView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsoleView for TerminalConsoleView {
    fn show_waiting_list(&mut self, sessions: &[ChatSession]) {
        if sessions.is_empty() {
            println!("No customers waiting.");
            return;
        }
        println!("Waiting customers:");
        for (index, session) in sessions.iter().enumerate() {
            println!(
                "  {}. {} <{}> since {}",
                index + 1,
                session.customer_display_name,
                session.customer_contact,
                session.created_at.format("%H:%M")
            );
        }
        println!("(accept <n> to claim)");
    }

    fn show_session(&mut self, session: &ChatSession) {
        self.printed.clear();
        println!(
            "--- chatting with {} <{}> (/end to close) ---",
            session.customer_display_name, session.customer_contact
        );
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
            println!("[{}] {who}: {}", message.sent_at.format("%H:%M"), message.text);
        }
    }

    fn show_ended(&mut self) {
        println!("--- chat ended ---");
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("! {message}");
    }
}

/// A console command typed while no session is claimed.
#[derive(Debug, PartialEq, Eq)]
enum ListCommand {
    Accept(usize),
    List,
    Unknown,
}

fn parse_list_command(line: &str) -> ListCommand {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("accept"), Some(n)) => n
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map_or(ListCommand::Unknown, |n| ListCommand::Accept(n - 1)),
        (Some("list"), None) => ListCommand::List,
        _ => ListCommand::Unknown,
    }
}

/// Interactive support console on stdin/stdout.
///
/// # Errors
///
/// Returns `AppError::Support` if the waiting list cannot be attached and
/// `AppError::Io` if stdin cannot be read. Other failures are shown and the
/// loop carries on.
pub async fn run_console<S, F>(ctx: &AdminContext<S>, shutdown: F) -> Result<()>
where
    S: RealtimeStore,
    F: Future<Output = ()>,
{
    let mut console = ctx.console(TerminalConsoleView::new());
    let mut waiting = console.subscribe_waiting_sessions().await?;
    let mut latest: Vec<ChatSession> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            list = waiting.next() => {
                match list {
                    Some(Ok(sessions)) => {
                        latest = sessions;
                        if console.claimed_session().is_none() {
                            console.on_waiting_list(&latest);
                        }
                    }
                    Some(Err(e)) => report(console.view_mut(), &e.into()),
                    None => {
                        report(
                            console.view_mut(),
                            &StoreError::Unavailable("waiting list listener ended".into()).into(),
                        );
                        break;
                    }
                }
            }
            update = console.next_update(), if console.is_listening() => {
                match update {
                    Ok(_) if console.claimed_session().is_none() => console.on_waiting_list(&latest),
                    Ok(_) => {}
                    Err(e) => report(console.view_mut(), &e.into()),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "/quit" {
                    break;
                }

                if let Some(session_id) = console.claimed_session().cloned() {
                    let result = if line == "/end" {
                        console.end_session(&session_id).await.map(|()| true)
                    } else {
                        console.send_admin_message(&session_id, line).await.map(|_| false)
                    };
                    match result {
                        Ok(true) => console.on_waiting_list(&latest),
                        Ok(false) => {}
                        Err(e) => report(console.view_mut(), &e.into()),
                    }
                    continue;
                }

                match parse_list_command(line) {
                    ListCommand::Accept(index) => {
                        let Some(session_id) = latest.get(index).map(|s| s.id.clone()) else {
                            report(console.view_mut(), &AppError::BadRequest(format!("no session number {}", index + 1)));
                            continue;
                        };
                        if let Err(e) = console.accept_session(&session_id).await {
                            report(console.view_mut(), &e.into());
                        }
                    }
                    ListCommand::List => console.on_waiting_list(&latest),
                    ListCommand::Unknown => println!("Commands: accept <n>, list, /quit"),
                }
            }
        }
    }

    waiting.stop();
    Ok(())
}

fn report<V: ConsoleView>(view: &mut V, error: &AppError) {
    error.report();
    view.show_error(&error.user_message());
}

/// Ban a user.
///
/// # Errors
///
/// Returns `AppError::Moderation` if the ban is rejected or fails.
pub async fn run_ban<S: RealtimeStore>(ctx: &AdminContext<S>, target: &str, reason: &str) -> Result<()> {
    let target = UserId::new(target);
    moderation::ban_user(ctx.store(), &ctx.identity().user_id, &target, reason).await?;
    println!("Banned {target}.");
    Ok(())
}

/// List every user except the acting admin.
///
/// # Errors
///
/// Returns `AppError::Store` if the read fails.
pub async fn run_users<S: RealtimeStore>(ctx: &AdminContext<S>) -> Result<()> {
    for entry in moderation::list_users(ctx.store(), &ctx.identity().user_id).await? {
        let name = entry.profile.display_name().unwrap_or("(no name)");
        let email = entry.profile.email.as_deref().unwrap_or("-");
        match entry.profile.ban_reason() {
            Some(reason) => println!("{} {name} <{email}> BANNED: {reason}", entry.id),
            None => println!("{} {name} <{email}>", entry.id),
        }
    }
    Ok(())
}

/// Print users matching `query`, marking verified accounts.
///
/// # Errors
///
/// Returns `AppError::Store` if the read fails.
pub async fn run_search<S: RealtimeStore>(ctx: &AdminContext<S>, query: &str) -> Result<()> {
    let found = moderation::search_users(ctx.store(), query).await?;
    if found.is_empty() {
        println!("No users found.");
    }
    for entry in found {
        let name = entry.profile.display_name().unwrap_or("Unnamed User");
        let email = entry.profile.email.as_deref().unwrap_or("No email");
        let mark = if entry.profile.verified { " \u{2713}" } else { "" };
        println!("{} {name}{mark} <{email}>", entry.id);
    }
    Ok(())
}

/// Queue a promotion for the account registered with `email`.
///
/// # Errors
///
/// Returns `AppError::Moderation` if no account matches or the write fails.
pub async fn run_promote<S: RealtimeStore>(ctx: &AdminContext<S>, email: &str, message: &str) -> Result<()> {
    let recipient = moderation::send_promotion(ctx.store(), email, message).await?;
    println!("Promotion queued for {recipient}.");
    Ok(())
}

/// Print every order, newest first.
///
/// # Errors
///
/// Returns `AppError::Store` if the read fails.
pub async fn run_orders_list<S: RealtimeStore>(ctx: &AdminContext<S>) -> Result<()> {
    for order in orders::list_orders(ctx.store()).await? {
        let record = &order.record;
        println!(
            "{} [{}] {} {}{} {} {}",
            order.id,
            record.status,
            record.item_name,
            record.final_price,
            if record.is_discounted { " (discounted)" } else { "" },
            record.user_email,
            record.timestamp.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

/// Approve or deny a pending order.
///
/// # Errors
///
/// Returns `AppError::Order` if the order is missing or already decided.
pub async fn run_decide<S: RealtimeStore>(ctx: &AdminContext<S>, id: &str, approve: bool) -> Result<()> {
    let id = OrderId::new(id);
    let order = if approve {
        orders::approve_order(ctx.store(), &id).await?
    } else {
        orders::deny_order(ctx.store(), &id).await?
    };
    println!("Order {} is now {}.", order.id, order.record.status);
    Ok(())
}

/// Set the announcement banner.
///
/// # Errors
///
/// Returns `AppError::Site` for blank text or a failed write.
pub async fn run_announce<S: RealtimeStore>(ctx: &AdminContext<S>, text: &str) -> Result<()> {
    let announcement = site::set_announcement(ctx.store(), text).await?;
    println!("Announcement set: {}", announcement.text);
    Ok(())
}

/// Flip the store between open and closed.
///
/// # Errors
///
/// Returns `AppError::Store` if the read or write fails.
pub async fn run_site_toggle<S: RealtimeStore>(ctx: &AdminContext<S>) -> Result<()> {
    let status = site::toggle_site_status(ctx.store()).await?;
    println!(
        "Store is now {}.",
        if status.is_active { "open" } else { "closed" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_command() {
        assert_eq!(parse_list_command("accept 2"), ListCommand::Accept(1));
        assert_eq!(parse_list_command("accept 0"), ListCommand::Unknown);
        assert_eq!(parse_list_command("accept x"), ListCommand::Unknown);
        assert_eq!(parse_list_command("list"), ListCommand::List);
        assert_eq!(parse_list_command("hello"), ListCommand::Unknown);
    }
}
