//! Customer client and admin console working one session end to end.

#![allow(clippy::unwrap_used)]

use icyxr_core::ordering::Attribution;
use icyxr_core::store::path::{chat_messages, chat_status};
use icyxr_core::{RealtimeStore, SessionStatus, SupportError, UserId};
use icyxr_integration_tests::{ADMIN_ID, Harness};
use icyxr_realtime::{MemoryStore, RecordingStore, WriteKind};
use icyxr_storefront::support::view::{CONNECTED, ENDED_BY_ADMIN};
use serde_json::json;

// =============================================================================
// Waiting List and Claiming
// =============================================================================

#[tokio::test]
async fn test_request_appears_in_waiting_list_until_accepted() {
    let mut h = Harness::new(MemoryStore::new());
    let mut waiting = h.admin.subscribe_waiting_sessions().await.unwrap();
    assert!(waiting.next().await.unwrap().unwrap().is_empty());

    let id = h.request("a@x.com").await.unwrap();
    let list = waiting.next().await.unwrap().unwrap();
    let contacts: Vec<&str> = list.iter().map(|s| s.customer_contact.as_str()).collect();
    assert_eq!(contacts, ["a@x.com"]);
    assert_eq!(list.first().unwrap().id, id);

    h.accept(&id).await.unwrap();
    assert_eq!(h.customer.status(), Some(SessionStatus::Active));
    assert!(waiting.next().await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn test_two_admins_race_for_one_session() {
    let store = MemoryStore::new();
    let mut h = Harness::new(store.clone());
    let id = h.request("a@x.com").await.unwrap();

    let mut rival = icyxr_admin::support::SupportConsole::new(
        store,
        icyxr_admin::support::RecordingConsoleView::new(),
        UserId::new("admin-2"),
    );
    h.accept(&id).await.unwrap();
    assert_eq!(
        rival.accept_session(&id).await,
        Err(SupportError::SessionNoLongerAvailable)
    );
    assert!(rival.claimed_session().is_none());
}

#[tokio::test]
async fn test_connected_banner_shown_once() {
    let mut h = Harness::new(MemoryStore::new());
    let id = h.request("a@x.com").await.unwrap();
    h.accept(&id).await.unwrap();

    // Another write to the record while active.
    h.admin.send_admin_message(&id, "hi").await.unwrap();
    h.settle().await.unwrap();

    assert_eq!(h.customer.view().connected_count(), 1);
    let connected_lines = h
        .customer
        .view()
        .bot_messages()
        .into_iter()
        .filter(|line| *line == CONNECTED)
        .count();
    assert_eq!(connected_lines, 1);
    assert!(h.customer.input_enabled());
}

#[tokio::test]
async fn test_status_never_moves_backwards() {
    let mut h = Harness::new(MemoryStore::new());
    let id = h.request("a@x.com").await.unwrap();
    h.accept(&id).await.unwrap();

    h.store
        .set(&chat_status(&id).unwrap(), json!("waiting"))
        .await
        .unwrap();
    h.settle().await.unwrap();

    assert_eq!(h.customer.status(), Some(SessionStatus::Active));
    assert!(h.customer.send_message(&id, "still here").await.is_ok());
}

// =============================================================================
// Messaging
// =============================================================================

#[tokio::test]
async fn test_send_before_accept_fails_then_succeeds() {
    let mut h = Harness::new(MemoryStore::new());
    let id = h.request("a@x.com").await.unwrap();

    assert_eq!(
        h.customer.send_message(&id, "hello").await,
        Err(SupportError::NoActiveSession)
    );
    h.accept(&id).await.unwrap();
    assert!(h.customer.send_message(&id, "hello").await.is_ok());
}

#[tokio::test]
async fn test_both_sides_render_the_same_conversation() {
    let mut h = Harness::new(MemoryStore::new());
    let id = h.request("a@x.com").await.unwrap();
    h.accept(&id).await.unwrap();

    h.customer.send_message(&id, "hello").await.unwrap();
    h.settle().await.unwrap();
    h.admin.send_admin_message(&id, "hi").await.unwrap();
    h.settle().await.unwrap();

    assert_eq!(h.customer.view().rendered_texts(), ["hello", "hi"]);
    assert_eq!(h.admin.view().rendered_texts(), ["hello", "hi"]);

    let attributions: Vec<Attribution> = h
        .customer
        .view()
        .last_render()
        .unwrap()
        .iter()
        .map(|m| m.attribution)
        .collect();
    assert_eq!(attributions, [Attribution::Own, Attribution::Other]);

    let admin_line = h.customer.view().last_render().unwrap().last().unwrap();
    assert_eq!(admin_line.sender_display_name, "Admin");
}

#[tokio::test]
async fn test_whitespace_messages_are_rejected_on_both_sides() {
    let mut h = Harness::new(MemoryStore::new());
    let id = h.request("a@x.com").await.unwrap();
    h.accept(&id).await.unwrap();

    assert_eq!(
        h.customer.send_message(&id, " \n\t").await,
        Err(SupportError::EmptyMessage)
    );
    assert_eq!(
        h.admin.send_admin_message(&id, "   ").await,
        Err(SupportError::EmptyMessage)
    );
    let messages = h.store.get(&chat_messages(&id).unwrap()).await.unwrap();
    assert_eq!(messages, None);
}

#[tokio::test]
async fn test_empty_admin_message_makes_no_store_writes() {
    let store = RecordingStore::new(MemoryStore::new());
    let mut h = Harness::new(store.clone());
    let id = h.request("a@x.com").await.unwrap();
    h.accept(&id).await.unwrap();
    store.clear();

    assert_eq!(
        h.admin.send_admin_message(&id, "").await,
        Err(SupportError::EmptyMessage)
    );
    assert!(store.writes().is_empty());
    assert_eq!(store.writes_under(&chat_messages(&id).unwrap()), 0);

    h.admin.send_admin_message(&id, "hi").await.unwrap();
    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes.first().unwrap().kind, WriteKind::Push);
}

// =============================================================================
// Ending
// =============================================================================

#[tokio::test]
async fn test_admin_end_disables_customer_input() {
    let mut h = Harness::new(MemoryStore::new());
    let id = h.request("a@x.com").await.unwrap();
    h.accept(&id).await.unwrap();

    h.admin.end_session(&id).await.unwrap();
    h.settle().await.unwrap();

    assert_eq!(h.customer.status(), Some(SessionStatus::Closed));
    assert!(!h.customer.input_enabled());
    assert!(!h.customer.is_listening());
    assert_eq!(h.customer.view().ended_count(), 1);
    assert_eq!(h.customer.view().bot_messages().last(), Some(&ENDED_BY_ADMIN));
    assert_eq!(
        h.customer.send_message(&id, "wait").await,
        Err(SupportError::NoActiveSession)
    );
    assert_eq!(
        h.admin.send_admin_message(&id, "bye").await,
        Err(SupportError::NoActiveSession)
    );
}

#[tokio::test]
async fn test_customer_closing_locally_leaves_record_untouched() {
    let store = RecordingStore::new(MemoryStore::new());
    let mut h = Harness::new(store.clone());
    let id = h.request("a@x.com").await.unwrap();
    h.accept(&id).await.unwrap();
    store.clear();

    h.customer.close_local_session();
    assert!(store.writes().is_empty());
    assert!(h.customer.session_id().is_none());

    // The admin still sees an active session and can end it.
    h.admin.end_session(&id).await.unwrap();
    assert_eq!(
        h.store.get(&chat_status(&id).unwrap()).await.unwrap(),
        Some(json!("closed"))
    );
    assert_eq!(h.admin.admin_id(), &UserId::new(ADMIN_ID));
}
