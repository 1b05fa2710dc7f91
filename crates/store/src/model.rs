//! Record types persisted by the shop store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{Money, OrderId, OrderItemId, ProductId, UserId};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Data for creating a user. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Current price in cents, strictly positive.
    pub price: Money,
    pub category: String,
    /// Ordered list of 3-4 ingredient names.
    pub ingredients: Vec<String>,
    /// Units available for allocation to orders, never negative.
    pub stock: i32,
}

/// Data for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub ingredients: Vec<String>,
    pub stock: i32,
}

/// Partial update of a product. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub stock: Option<i32>,
}

/// A single product+quantity line within an order.
///
/// Product name and price are joined from the current product record at
/// read time; no denormalized copy is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub product_name: String,
    pub price: Money,
}

/// An order with its line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Looks up a line item by its identifier.
    pub fn item(&self, item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

/// Default status assigned to a freshly created order.
pub const ORDER_STATUS_CREATED: &str = "created";
