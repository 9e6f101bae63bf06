//! Order review: list placed orders and approve or deny them.

use icyxr_core::models::{ANONYMOUS_USER, Order, decode_orders};
use icyxr_core::store::path::{order, orders};
use icyxr_core::{OrderId, OrderStatus, RealtimeStore, StoreError};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::notify::push_notification;

/// Sent to the customer when their order is approved.
pub const APPROVED_NOTICE: &str = "Your recent order has been approved! Brooke will be in touch.";
/// Sent to the customer when their order is denied.
pub const DENIED_NOTICE: &str =
    "Unfortunately, your recent order has been denied. Please contact support for details.";

/// Errors that can occur when deciding an order.
#[derive(Debug, Error)]
pub enum OrderDecisionError {
    #[error("Order {0} not found")]
    NotFound(OrderId),

    #[error("Order {id} is already {status}")]
    AlreadyDecided { id: OrderId, status: OrderStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Every order, newest first.
///
/// # Errors
///
/// Returns `StoreError` if the read fails or an order is malformed.
pub async fn list_orders<S: RealtimeStore>(store: &S) -> Result<Vec<Order>, StoreError> {
    let path = orders();
    decode_orders(&path, store.get(&path).await?)
}

/// Approve a pending order and tell the customer.
///
/// # Errors
///
/// See [`decide_order`].
pub async fn approve_order<S: RealtimeStore>(store: &S, id: &OrderId) -> Result<Order, OrderDecisionError> {
    decide_order(store, id, OrderStatus::Approved).await
}

/// Deny a pending order and tell the customer.
///
/// # Errors
///
/// See [`decide_order`].
pub async fn deny_order<S: RealtimeStore>(store: &S, id: &OrderId) -> Result<Order, OrderDecisionError> {
    decide_order(store, id, OrderStatus::Denied).await
}

/// Move a pending order to `decision` and queue the matching notice for the
/// customer. Guest orders are decided without a notice.
///
/// # Errors
///
/// Returns `OrderDecisionError::NotFound` if the order does not exist,
/// `AlreadyDecided` unless it is pending (including when another admin
/// decided it first), and `Store` if a read or write fails.
#[instrument(skip(store), fields(order_id = %id, decision = %decision))]
pub async fn decide_order<S: RealtimeStore>(
    store: &S,
    id: &OrderId,
    decision: OrderStatus,
) -> Result<Order, OrderDecisionError> {
    let path = order(id)?;
    let value = store
        .get(&path)
        .await?
        .ok_or_else(|| OrderDecisionError::NotFound(id.clone()))?;
    let stored_status = value.get("status").cloned();
    let mut current = Order::from_value(id.clone(), &path, value)?;
    if current.record.status != OrderStatus::Pending {
        return Err(OrderDecisionError::AlreadyDecided {
            id: id.clone(),
            status: current.record.status,
        });
    }

    let decided = store
        .compare_and_set(
            &path.child("status")?,
            stored_status,
            Value::from(decision.as_str()),
        )
        .await?;
    if !decided {
        let status = match store.get(&path.child("status")?).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| StoreError::decode(&path, e))?,
            None => OrderStatus::Pending,
        };
        return Err(OrderDecisionError::AlreadyDecided {
            id: id.clone(),
            status,
        });
    }
    current.record.status = decision;
    info!("order decided");

    let notice = match decision {
        OrderStatus::Approved => APPROVED_NOTICE,
        OrderStatus::Denied => DENIED_NOTICE,
        OrderStatus::Pending => return Ok(current),
    };
    if current.record.user_id.as_str() == ANONYMOUS_USER {
        debug!("guest order, no notice sent");
    } else {
        push_notification(store, &current.record.user_id, notice).await?;
    }
    Ok(current)
}
