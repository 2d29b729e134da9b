//! In-process backend for tests and `STORE_BACKEND=memory` runs.
//!
//! Records are kept in insertion order; listings return newest first to match
//! the MongoDB backend's `created_at: -1` sort.

use crate::models::{
    Category, Order, OrderStatus, Payment, PaymentStatus, Product, ProductUpdate, User,
    UserUpdate,
};
use crate::services::store::{OrderStore, PaymentStore, ProductCatalog, UserDirectory};
use async_trait::async_trait;
use mongodb::bson::DateTime;
use service_core::error::AppError;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<Vec<User>>,
    products: RwLock<Vec<Product>>,
    payments: RwLock<Vec<Payment>>,
    orders: RwLock<Vec<Order>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn create_user(&self, user: User) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.number == user.number || u.external_id == user.external_id)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "User with this number or external id already exists"
            )));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.read().await.iter().rev().cloned().collect())
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.number == number)
            .cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn update_user(
        &self,
        external_id: &str,
        update: UserUpdate,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if let Some(number) = update.number.as_deref() {
            if users
                .iter()
                .any(|u| u.number == number && u.external_id != external_id)
            {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Phone number is already registered"
                )));
            }
        }
        Ok(users
            .iter_mut()
            .find(|u| u.external_id == external_id)
            .map(|user| {
                user.apply(update);
                user.clone()
            }))
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn create_product(&self, product: Product) -> Result<Product, AppError> {
        let mut products = self.products.write().await;
        if products.iter().any(|p| p.name == product.name) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Product with this name already exists"
            )));
        }
        products.push(product.clone());
        Ok(product)
    }

    async fn list_products(&self, category: Option<Category>) -> Result<Vec<Product>, AppError> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .rev()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_products(&self, ids: &[String]) -> Result<Vec<Product>, AppError> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn update_product(
        &self,
        id: &str,
        update: ProductUpdate,
    ) -> Result<Option<Product>, AppError> {
        let mut products = self.products.write().await;
        if let Some(name) = update.name.as_deref() {
            if products.iter().any(|p| p.name == name && p.id != id) {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Product with this name already exists"
                )));
            }
        }
        Ok(products.iter_mut().find(|p| p.id == id).map(|product| {
            product.apply(update);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: &str) -> Result<bool, AppError> {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, payment: &Payment) -> Result<(), AppError> {
        self.payments.write().await.push(payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, AppError> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_payments(&self, ids: &[String]) -> Result<Vec<Payment>, AppError> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn find_by_razorpay_order_id(
        &self,
        razorpay_order_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .find(|p| p.razorpay_order_id.as_deref() == Some(razorpay_order_id))
            .cloned())
    }

    async fn link_order(&self, payment_id: &str, order_id: &str) -> Result<(), AppError> {
        let mut payments = self.payments.write().await;
        if let Some(payment) = payments.iter_mut().find(|p| p.id == payment_id) {
            payment.order_id = Some(order_id.to_string());
            payment.updated_at = DateTime::now();
        }
        Ok(())
    }

    async fn mark_paid(
        &self,
        payment_id: &str,
        razorpay_payment_id: &str,
    ) -> Result<bool, AppError> {
        let mut payments = self.payments.write().await;
        match payments
            .iter_mut()
            .find(|p| p.id == payment_id && p.status == PaymentStatus::Created)
        {
            Some(payment) => {
                payment.status = PaymentStatus::Paid;
                payment.razorpay_payment_id = Some(razorpay_payment_id.to_string());
                payment.updated_at = DateTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_unlinked(&self, since: DateTime) -> Result<Vec<Payment>, AppError> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.order_id.is_none() && p.created_at >= since)
            .cloned()
            .collect())
    }

    async fn list_unreconciled_paid(&self) -> Result<Vec<Payment>, AppError> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid && !p.reconciled)
            .cloned()
            .collect())
    }

    async fn mark_reconciled(&self, payment_id: &str) -> Result<(), AppError> {
        let mut payments = self.payments.write().await;
        if let Some(payment) = payments.iter_mut().find(|p| p.id == payment_id) {
            payment.reconciled = true;
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), AppError> {
        self.orders.write().await.push(order.clone());
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        Ok(self.orders.read().await.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, AppError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|o| o.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool, AppError> {
        let mut orders = self.orders.write().await;
        match orders
            .iter_mut()
            .find(|o| o.id == id && from.contains(&o.status))
        {
            Some(order) => {
                order.status = to;
                order.updated_at = DateTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_user_and_status(
        &self,
        user_id: &str,
        status: OrderStatus,
    ) -> Result<Vec<Order>, AppError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id && o.status == status)
            .cloned()
            .collect())
    }
}
