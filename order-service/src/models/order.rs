use crate::models::{Money, MoneyError};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting payment through the gateway or a direct transfer.
    Created,
    /// Cash on delivery; nothing to collect up front.
    Pending,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses only move forward; `Confirmed` and `Cancelled` are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Created, OrderStatus::Confirmed)
                | (OrderStatus::Created, OrderStatus::Cancelled)
                | (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }

    /// Every status that may move to `next`.
    pub fn sources_for(next: OrderStatus) -> Vec<OrderStatus> {
        [
            OrderStatus::Created,
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Cancelled,
        ]
        .into_iter()
        .filter(|s| s.can_transition_to(next))
        .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of a product as the client ordered it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(alias = "product_id")]
    #[validate(length(min = 1, message = "Product id is required"))]
    pub product_id: String,
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
    pub price: Money,
}

impl LineItem {
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.price.checked_mul(self.quantity)
    }
}

/// Sum of price × quantity over all items.
pub fn line_items_total(items: &[LineItem]) -> Result<Money, MoneyError> {
    items
        .iter()
        .try_fold(Money::zero(), |acc, item| acc.checked_add(item.line_total()?))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    #[validate(length(min = 1, message = "Recipient name is required"))]
    pub name: String,
    #[validate(length(min = 10, message = "Phone number must be at least 10 characters"))]
    pub phone: String,
    #[serde(alias = "address_line1")]
    #[validate(length(min = 1, message = "Address line 1 is required"))]
    pub address_line1: String,
    #[serde(default, alias = "address_line2", skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "Pincode is required"))]
    pub pincode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub products: Vec<LineItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_id: Option<String>,
    pub delivery_address: DeliveryAddress,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
