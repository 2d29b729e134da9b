pub mod money;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;

pub use money::{Money, MoneyError};
pub use order::{line_items_total, DeliveryAddress, LineItem, Order, OrderStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use product::{Category, Product, ProductUpdate};
pub use user::{Address, User, UserUpdate};

/// Fresh record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
