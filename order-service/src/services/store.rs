//! Persistence contracts for the four record kinds.
//!
//! The workflow only sees these traits; MongoDB and in-memory backends both
//! implement them.

use crate::models::{
    Category, Order, OrderStatus, Payment, Product, ProductUpdate, User, UserUpdate,
};
use async_trait::async_trait;
use mongodb::bson::DateTime;
use service_core::error::AppError;
use std::sync::Arc;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fails with `Conflict` when the phone number or external id is taken.
    async fn create_user(&self, user: User) -> Result<User, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn find_by_number(&self, number: &str) -> Result<Option<User>, AppError>;
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, AppError>;
    async fn update_user(
        &self,
        external_id: &str,
        update: UserUpdate,
    ) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fails with `Conflict` when the name is taken.
    async fn create_product(&self, product: Product) -> Result<Product, AppError>;
    async fn list_products(&self, category: Option<Category>) -> Result<Vec<Product>, AppError>;
    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError>;
    async fn get_products(&self, ids: &[String]) -> Result<Vec<Product>, AppError>;
    async fn update_product(
        &self,
        id: &str,
        update: ProductUpdate,
    ) -> Result<Option<Product>, AppError>;
    /// Returns whether a product was removed.
    async fn delete_product(&self, id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(&self, payment: &Payment) -> Result<(), AppError>;
    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, AppError>;
    async fn get_payments(&self, ids: &[String]) -> Result<Vec<Payment>, AppError>;
    async fn find_by_razorpay_order_id(
        &self,
        razorpay_order_id: &str,
    ) -> Result<Option<Payment>, AppError>;
    /// Backfill the payment → order reference.
    async fn link_order(&self, payment_id: &str, order_id: &str) -> Result<(), AppError>;
    /// Set status `paid` and record the gateway payment id, only while the
    /// payment is still `created`. Returns whether the write was applied.
    async fn mark_paid(&self, payment_id: &str, razorpay_payment_id: &str)
        -> Result<bool, AppError>;
    /// Payments created at or after `since` that carry no order reference.
    async fn list_unlinked(&self, since: DateTime) -> Result<Vec<Payment>, AppError>;
    /// Paid payments whose order has not yet been settled by a sweep or a
    /// verification.
    async fn list_unreconciled_paid(&self) -> Result<Vec<Payment>, AppError>;
    /// Exclude the payment from later sweeps.
    async fn mark_reconciled(&self, payment_id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<(), AppError>;
    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError>;
    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, AppError>;
    /// Move the order to `to` only if it currently has one of `from`.
    /// Returns whether the transition was applied.
    async fn transition_status(
        &self,
        id: &str,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool, AppError>;
    /// Newest first.
    async fn list_by_user_and_status(
        &self,
        user_id: &str,
        status: OrderStatus,
    ) -> Result<Vec<Order>, AppError>;
}

/// The four stores the workflow depends on, shared behind `Arc<dyn _>`.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserDirectory>,
    pub products: Arc<dyn ProductCatalog>,
    pub payments: Arc<dyn PaymentStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl Stores {
    /// Use one backend for every record kind.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: UserDirectory + ProductCatalog + PaymentStore + OrderStore + 'static,
    {
        Self {
            users: store.clone(),
            products: store.clone(),
            payments: store.clone(),
            orders: store,
        }
    }
}
