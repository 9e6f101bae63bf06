//! Price list, discount code and order placement.

use chrono::Utc;
use icyxr_core::models::{OrderRecord, SiteStatus};
use icyxr_core::store::path::{orders, site_status};
use icyxr_core::{OrderId, OrderStatus, Price, RealtimeStore, StoreError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use crate::state::Customer;

/// The one discount code the store accepts.
pub const DISCOUNT_CODE: &str = "6543210445";

/// 5 % off.
#[must_use]
pub fn discount_rate() -> Decimal {
    Decimal::new(5, 2)
}

/// Errors that can occur when ordering.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("The store is currently closed and not accepting new orders.")]
    StoreClosed,

    #[error("Please select an item to purchase.")]
    NoItemSelected,

    #[error("No item number {0} in the price list")]
    UnknownItem(usize),

    #[error("Invalid discount code!")]
    InvalidDiscountCode,

    #[error("Discount already active.")]
    AlreadyActive,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A priced print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub name: &'static str,
    pub price: Price,
    pub print_time: &'static str,
}

/// The price list, in display order.
#[must_use]
pub fn catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem {
            name: "(S) Shark Toy",
            price: Price::from_pence(180),
            print_time: "25m 46s",
        },
        CatalogItem {
            name: "(M) Dragon",
            price: Price::from_pence(617),
            print_time: "1h 24m",
        },
    ]
}

/// Selected item and discount state for one customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Basket {
    selected: Option<usize>,
    discount_active: bool,
}

impl Basket {
    /// An empty basket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select item `index`; selecting the selected item clears the choice.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UnknownItem` if the price list has no such item.
    pub fn toggle(&mut self, index: usize) -> Result<(), OrderError> {
        if index >= catalog().len() {
            return Err(OrderError::UnknownItem(index));
        }
        self.selected = if self.selected == Some(index) {
            None
        } else {
            Some(index)
        };
        Ok(())
    }

    /// The selected item's index.
    #[must_use]
    pub const fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Apply a discount code.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidDiscountCode` for the wrong code and
    /// `OrderError::AlreadyActive` if it was already applied.
    pub fn redeem(&mut self, code: &str) -> Result<(), OrderError> {
        if code.trim() != DISCOUNT_CODE {
            return Err(OrderError::InvalidDiscountCode);
        }
        if self.discount_active {
            return Err(OrderError::AlreadyActive);
        }
        self.discount_active = true;
        Ok(())
    }

    /// Whether the discount code has been applied.
    #[must_use]
    pub const fn discount_active(&self) -> bool {
        self.discount_active
    }
}

/// What an item costs, with or without the discount.
#[must_use]
pub fn final_price(item: &CatalogItem, discount_active: bool) -> Price {
    if discount_active {
        item.price.discounted(discount_rate())
    } else {
        item.price
    }
}

/// Places orders into the `Orders` collection.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
}

impl<S: RealtimeStore> OrderService<S> {
    /// Create the service.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Place an order for the selected item as a `pending` order.
    ///
    /// # Errors
    ///
    /// - `OrderError::StoreClosed` if the site is marked inactive
    /// - `OrderError::NoItemSelected` / `OrderError::UnknownItem` for a bad
    ///   selection
    /// - `OrderError::Store` if the store cannot be reached
    #[instrument(skip(self, customer), fields(customer_id = %customer.id()))]
    pub async fn place_order(
        &self,
        customer: &Customer,
        item_index: Option<usize>,
        discount_active: bool,
    ) -> Result<OrderId, OrderError> {
        let status_path = site_status();
        let status = SiteStatus::from_snapshot(&status_path, self.store.get(&status_path).await?)?;
        if !status.is_active {
            return Err(OrderError::StoreClosed);
        }

        let index = item_index.ok_or(OrderError::NoItemSelected)?;
        let item = catalog()
            .into_iter()
            .nth(index)
            .ok_or(OrderError::UnknownItem(index))?;

        let record = OrderRecord {
            item_name: item.name.to_owned(),
            final_price: final_price(&item, discount_active),
            is_discounted: discount_active,
            user_email: customer.contact().to_owned(),
            user_id: customer.order_user_id(),
            timestamp: Utc::now(),
            status: OrderStatus::Pending,
        };

        let path = orders();
        let key = self.store.push(&path, record.to_value(&path)?).await?;
        info!(order_id = %key, item = item.name, price = %record.final_price, "order placed");
        Ok(OrderId::new(key))
    }

    /// Place an order from a basket.
    ///
    /// # Errors
    ///
    /// Same as [`OrderService::place_order`].
    pub async fn checkout(&self, customer: &Customer, basket: &Basket) -> Result<OrderId, OrderError> {
        self.place_order(customer, basket.selected(), basket.discount_active())
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use icyxr_core::{Email, UserId};
    use icyxr_realtime::MemoryStore;
    use serde_json::json;

    use super::*;

    fn signed_in() -> Customer {
        Customer::signed_in(
            UserId::new("u1"),
            Some(Email::parse("a@x.com").unwrap()),
            Some("Brooke".into()),
        )
    }

    #[test]
    fn test_discount_code() {
        let mut basket = Basket::new();
        assert!(matches!(
            basket.redeem("123"),
            Err(OrderError::InvalidDiscountCode)
        ));
        basket.redeem(" 6543210445 ").unwrap();
        assert!(basket.discount_active());
        assert!(matches!(
            basket.redeem(DISCOUNT_CODE),
            Err(OrderError::AlreadyActive)
        ));
    }

    #[test]
    fn test_toggle_selection() {
        let mut basket = Basket::new();
        basket.toggle(1).unwrap();
        assert_eq!(basket.selected(), Some(1));
        basket.toggle(1).unwrap();
        assert_eq!(basket.selected(), None);
        assert!(matches!(basket.toggle(9), Err(OrderError::UnknownItem(9))));
    }

    #[test]
    fn test_discounted_prices() {
        let items = catalog();
        assert_eq!(final_price(&items[0], true), Price::from_pence(171));
        assert_eq!(final_price(&items[1], true), Price::from_pence(586));
        assert_eq!(final_price(&items[1], false), Price::from_pence(617));
    }

    #[tokio::test]
    async fn test_place_order_writes_pending_order() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());

        let id = service.place_order(&signed_in(), Some(0), true).await.unwrap();

        let stored = store.get(&orders().child(id.as_str()).unwrap()).await.unwrap().unwrap();
        assert_eq!(stored["itemName"], "(S) Shark Toy");
        assert_eq!(stored["finalPrice"], json!(1.71));
        assert_eq!(stored["isDiscounted"], true);
        assert_eq!(stored["userEmail"], "a@x.com");
        assert_eq!(stored["userId"], "u1");
        assert_eq!(stored["status"], "pending");
    }

    #[tokio::test]
    async fn test_guest_orders_as_anonymous() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());
        let mut basket = Basket::new();
        basket.toggle(1).unwrap();

        let id = service
            .checkout(&Customer::guest(Utc::now()), &basket)
            .await
            .unwrap();
        let stored = store.get(&orders().child(id.as_str()).unwrap()).await.unwrap().unwrap();
        assert_eq!(stored["userEmail"], "Guest");
        assert_eq!(stored["userId"], "anonymous");
        assert_eq!(stored["finalPrice"], json!(6.17));
    }

    #[tokio::test]
    async fn test_closed_store_rejects_orders() {
        let store = MemoryStore::with_data(json!({"siteStatus": {"isActive": false}}));
        let service = OrderService::new(store.clone());

        let err = service.place_order(&signed_in(), Some(0), false).await.unwrap_err();
        assert!(matches!(err, OrderError::StoreClosed));
        assert_eq!(store.get(&orders()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_no_selection_rejected() {
        let service = OrderService::new(MemoryStore::new());
        let err = service.place_order(&signed_in(), None, false).await.unwrap_err();
        assert!(matches!(err, OrderError::NoItemSelected));
    }
}
