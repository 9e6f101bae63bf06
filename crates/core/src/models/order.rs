//! Orders placed through the storefront.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{StoreError, StorePath};
use crate::types::{OrderId, OrderStatus, Price, UserId};

/// User ID recorded for orders placed by visitors who are not signed in.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Stored shape of an order document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Catalog item name.
    pub item_name: String,
    /// Price charged, after any discount.
    pub final_price: Price,
    /// Whether the discount code was applied.
    pub is_discounted: bool,
    /// Customer email, or `Guest`.
    pub user_email: String,
    /// Customer ID, or `anonymous`.
    pub user_id: UserId,
    /// When the order was placed.
    pub timestamp: DateTime<Utc>,
    /// Review state.
    #[serde(default)]
    pub status: OrderStatus,
}

/// An order together with its store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Store-assigned key.
    pub id: OrderId,
    /// Order details.
    pub record: OrderRecord,
}

impl OrderRecord {
    /// Document written to the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if serialization fails.
    pub fn to_value(&self, path: &StorePath) -> Result<Value, StoreError> {
        serde_json::to_value(self).map_err(|e| StoreError::decode(path, e))
    }
}

impl Order {
    /// Decode an order read from `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the document is malformed.
    pub fn from_value(id: OrderId, path: &StorePath, value: Value) -> Result<Self, StoreError> {
        let record = serde_json::from_value(value).map_err(|e| StoreError::decode(path, e))?;
        Ok(Self { id, record })
    }
}

/// Decode the `Orders` collection, newest first.
///
/// # Errors
///
/// Returns `StoreError::Decode` if any order is malformed.
pub fn decode_orders(path: &StorePath, value: Option<Value>) -> Result<Vec<Order>, StoreError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let Value::Object(children) = value else {
        return Err(StoreError::decode(path, "expected a collection of orders"));
    };

    let mut orders = children
        .into_iter()
        .map(|(key, child)| {
            let child_path = path.child(&key)?;
            Order::from_value(OrderId::new(key), &child_path, child)
        })
        .collect::<Result<Vec<_>, _>>()?;
    orders.reverse();
    Ok(orders)
}
