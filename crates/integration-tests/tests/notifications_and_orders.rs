//! Notification side-channel, order review, site flags and bans across the
//! storefront and admin crates.

#![allow(clippy::unwrap_used)]

use icyxr_admin::services::moderation::{ban_user, send_promotion};
use icyxr_admin::services::notify::push_notification;
use icyxr_admin::services::orders::{APPROVED_NOTICE, DENIED_NOTICE, approve_order, deny_order};
use icyxr_admin::services::site::{set_announcement, toggle_site_status};
use icyxr_core::models::site::CLOSED_BANNER;
use icyxr_core::store::path::notifications;
use icyxr_core::{Email, RealtimeStore, UserId};
use icyxr_realtime::MemoryStore;
use icyxr_storefront::services::catalog::{Basket, OrderError, OrderService};
use icyxr_storefront::services::inbox::NotificationInbox;
use icyxr_storefront::services::profile::{ProfileEvent, ProfileWatcher};
use icyxr_storefront::services::site::SiteWatcher;
use icyxr_storefront::state::Customer;
use serde_json::json;

fn customer() -> Customer {
    Customer::signed_in(
        UserId::new("u1"),
        Some(Email::parse("a@x.com").unwrap()),
        Some("Brooke".into()),
    )
}

async fn shown_messages(store: &MemoryStore, user: &UserId, count: usize) -> Vec<String> {
    let mut inbox = NotificationInbox::subscribe(store.clone(), user.clone()).await.unwrap();
    let mut shown = Vec::new();
    for _ in 0..count {
        let notification = inbox.consume_next(|_| {}).await.unwrap().unwrap();
        shown.push(notification.message);
    }
    inbox.stop();
    shown
}

// =============================================================================
// Notification Side-Channel
// =============================================================================

#[tokio::test]
async fn test_notifications_shown_in_order_then_removed() {
    let store = MemoryStore::new();
    let user = UserId::new("u1");
    push_notification(&store, &user, "A").await.unwrap();
    push_notification(&store, &user, "B").await.unwrap();

    let mut seen = Vec::new();
    let mut inbox = NotificationInbox::subscribe(store.clone(), user.clone()).await.unwrap();
    for _ in 0..2 {
        inbox
            .consume_next(|n| seen.push(n.message.clone()))
            .await
            .unwrap();
    }

    assert_eq!(seen, ["A", "B"]);
    assert_eq!(store.get(&notifications(&user).unwrap()).await.unwrap(), None);
}

#[tokio::test]
async fn test_notification_pushed_while_listening_is_delivered() {
    let store = MemoryStore::new();
    let user = UserId::new("u1");
    let mut inbox = NotificationInbox::subscribe(store.clone(), user.clone()).await.unwrap();

    push_notification(&store, &user, "late").await.unwrap();
    let shown = inbox.consume_next(|_| {}).await.unwrap().unwrap();
    assert_eq!(shown.message, "late");
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_approved_order_notifies_customer() {
    let store = MemoryStore::new();
    let mut basket = Basket::new();
    basket.toggle(0).unwrap();
    let order_id = OrderService::new(store.clone())
        .checkout(&customer(), &basket)
        .await
        .unwrap();

    approve_order(&store, &order_id).await.unwrap();
    assert_eq!(
        shown_messages(&store, &UserId::new("u1"), 1).await,
        [APPROVED_NOTICE]
    );
}

#[tokio::test]
async fn test_denied_order_notifies_customer() {
    let store = MemoryStore::new();
    let order_id = OrderService::new(store.clone())
        .place_order(&customer(), Some(1), false)
        .await
        .unwrap();

    deny_order(&store, &order_id).await.unwrap();
    assert_eq!(
        shown_messages(&store, &UserId::new("u1"), 1).await,
        [DENIED_NOTICE]
    );
}

#[tokio::test]
async fn test_closed_store_rejects_orders_and_changes_banner() {
    let store = MemoryStore::new();
    let mut watcher = SiteWatcher::subscribe(&store).await.unwrap();
    watcher.next_change().await.unwrap().unwrap();
    watcher.next_change().await.unwrap().unwrap();

    set_announcement(&store, "Holiday sale").await.unwrap();
    watcher.next_change().await.unwrap().unwrap();
    assert_eq!(watcher.banner(), "Holiday sale");

    toggle_site_status(&store).await.unwrap();
    watcher.next_change().await.unwrap().unwrap();
    assert!(!watcher.is_active());
    assert_eq!(watcher.banner(), CLOSED_BANNER);

    let result = OrderService::new(store.clone())
        .place_order(&customer(), Some(0), false)
        .await;
    assert!(matches!(result, Err(OrderError::StoreClosed)));
}

// =============================================================================
// Profiles, Bans and Promotions
// =============================================================================

#[tokio::test]
async fn test_ban_reaches_storefront_profile() {
    let store = MemoryStore::with_data(json!({
        "users": { "u1": { "name": "Brooke", "email": "a@x.com" } }
    }));
    let mut watcher = ProfileWatcher::subscribe(store.clone(), &UserId::new("u1"), None)
        .await
        .unwrap();
    assert_eq!(
        watcher.next_event().await.unwrap().unwrap(),
        ProfileEvent::Loaded {
            name: "Brooke".into()
        }
    );

    ban_user(&store, &UserId::new("admin-1"), &UserId::new("u1"), "Chargeback")
        .await
        .unwrap();
    assert_eq!(
        watcher.next_event().await.unwrap().unwrap(),
        ProfileEvent::Banned {
            reason: "Chargeback".into()
        }
    );
}

#[tokio::test]
async fn test_promotion_lands_in_inbox() {
    let store = MemoryStore::with_data(json!({
        "users": { "u1": { "name": "Brooke", "email": "A@X.com" } }
    }));
    let recipient = send_promotion(&store, "a@x.com", "Free shipping today")
        .await
        .unwrap();
    assert_eq!(
        shown_messages(&store, &recipient, 1).await,
        ["Free shipping today"]
    );
}
