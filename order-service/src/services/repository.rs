use crate::models::{
    Category, Order, OrderStatus, Payment, PaymentStatus, Product, ProductUpdate, User,
    UserUpdate,
};
use crate::services::store::{OrderStore, PaymentStore, ProductCatalog, UserDirectory};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{
    bson::{doc, DateTime, Document},
    Collection, Database, IndexModel,
};
use service_core::error::AppError;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB backend: one collection per record kind.
#[derive(Clone)]
pub struct MongoRepository {
    db: Database,
    users: Collection<User>,
    products: Collection<Product>,
    payments: Collection<Payment>,
    orders: Collection<Order>,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        // findAndModify reports the violation as a command error.
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn to_bson<T: serde::Serialize>(value: &T) -> Result<mongodb::bson::Bson, AppError> {
    mongodb::bson::to_bson(value).map_err(|e| AppError::DatabaseError(e.into()))
}

fn index(keys: Document, name: &str, unique: bool) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(unique)
                .build(),
        )
        .build()
}

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": -1 }).build()
}

fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

impl MongoRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            users: db.collection("users"),
            products: db.collection("products"),
            payments: db.collection("payments"),
            orders: db.collection("orders"),
        }
    }

    /// Create the lookup and uniqueness indexes.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        self.users
            .create_indexes(
                [
                    index(doc! { "number": 1 }, "user_number_idx", true),
                    index(doc! { "external_id": 1 }, "user_external_id_idx", true),
                ],
                None,
            )
            .await?;

        self.products
            .create_indexes(
                [
                    index(doc! { "name": 1 }, "product_name_idx", true),
                    index(doc! { "category": 1 }, "product_category_idx", false),
                ],
                None,
            )
            .await?;

        self.payments
            .create_indexes(
                [
                    index(
                        doc! { "razorpay_order_id": 1 },
                        "payment_razorpay_order_idx",
                        false,
                    ),
                    index(
                        doc! { "order_id": 1, "created_at": -1 },
                        "payment_order_idx",
                        false,
                    ),
                    index(
                        doc! { "status": 1, "reconciled": 1 },
                        "payment_status_idx",
                        false,
                    ),
                ],
                None,
            )
            .await?;

        self.orders
            .create_indexes(
                [
                    index(
                        doc! { "user_id": 1, "status": 1, "created_at": -1 },
                        "order_user_status_idx",
                        false,
                    ),
                    index(doc! { "payment_id": 1 }, "order_payment_idx", false),
                ],
                None,
            )
            .await?;

        tracing::info!("Order service indexes initialized");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MongoRepository {
    async fn create_user(&self, user: User) -> Result<User, AppError> {
        match self.users.insert_one(&user, None).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(anyhow::anyhow!(
                "User with this number or external id already exists"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let cursor = self.users.find(None, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.find_one(doc! { "number": number }, None).await?)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .find_one(doc! { "external_id": external_id }, None)
            .await?)
    }

    async fn update_user(
        &self,
        external_id: &str,
        update: UserUpdate,
    ) -> Result<Option<User>, AppError> {
        let mut set = doc! { "updated_at": mongodb::bson::DateTime::now() };
        if let Some(name) = update.name {
            set.insert("name", name);
        }
        if let Some(number) = update.number {
            set.insert("number", number);
        }
        if let Some(image) = update.image {
            set.insert("image", image);
        }
        if let Some(addresses) = update.addresses {
            set.insert("addresses", to_bson(&addresses)?);
        }

        match self
            .users
            .find_one_and_update(
                doc! { "external_id": external_id },
                doc! { "$set": set },
                return_updated(),
            )
            .await
        {
            Ok(user) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(anyhow::anyhow!(
                "Phone number is already registered"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ProductCatalog for MongoRepository {
    async fn create_product(&self, product: Product) -> Result<Product, AppError> {
        match self.products.insert_one(&product, None).await {
            Ok(_) => Ok(product),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(anyhow::anyhow!(
                "Product with this name already exists"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_products(&self, category: Option<Category>) -> Result<Vec<Product>, AppError> {
        let filter = category.map(|c| doc! { "category": c.as_str() });
        let cursor = self.products.find(filter, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self.products.find_one(doc! { "_id": id }, None).await?)
    }

    async fn get_products(&self, ids: &[String]) -> Result<Vec<Product>, AppError> {
        let cursor = self
            .products
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_product(
        &self,
        id: &str,
        update: ProductUpdate,
    ) -> Result<Option<Product>, AppError> {
        let mut set = doc! { "updated_at": mongodb::bson::DateTime::now() };
        if let Some(name) = update.name {
            set.insert("name", name);
        }
        if let Some(description) = update.description {
            set.insert("description", description);
        }
        if let Some(price) = update.price {
            set.insert("price", price.to_string());
        }
        if let Some(category) = update.category {
            set.insert("category", category.as_str());
        }
        if let Some(stock) = update.stock {
            set.insert("stock", i64::from(stock));
        }
        if let Some(weight) = update.weight {
            set.insert("weight", weight);
        }
        if let Some(image) = update.image {
            set.insert("image", image);
        }

        match self
            .products
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, return_updated())
            .await
        {
            Ok(product) => Ok(product),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(anyhow::anyhow!(
                "Product with this name already exists"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_product(&self, id: &str) -> Result<bool, AppError> {
        let result = self.products.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl PaymentStore for MongoRepository {
    async fn insert_payment(&self, payment: &Payment) -> Result<(), AppError> {
        self.payments.insert_one(payment, None).await?;
        Ok(())
    }

    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, AppError> {
        Ok(self.payments.find_one(doc! { "_id": id }, None).await?)
    }

    async fn get_payments(&self, ids: &[String]) -> Result<Vec<Payment>, AppError> {
        let cursor = self
            .payments
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_razorpay_order_id(
        &self,
        razorpay_order_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        Ok(self
            .payments
            .find_one(doc! { "razorpay_order_id": razorpay_order_id }, None)
            .await?)
    }

    async fn link_order(&self, payment_id: &str, order_id: &str) -> Result<(), AppError> {
        self.payments
            .update_one(
                doc! { "_id": payment_id },
                doc! {
                    "$set": {
                        "order_id": order_id,
                        "updated_at": mongodb::bson::DateTime::now()
                    }
                },
                None,
            )
            .await?;
        Ok(())
    }

    async fn mark_paid(
        &self,
        payment_id: &str,
        razorpay_payment_id: &str,
    ) -> Result<bool, AppError> {
        let result = self
            .payments
            .update_one(
                doc! { "_id": payment_id, "status": to_bson(&PaymentStatus::Created)? },
                doc! {
                    "$set": {
                        "status": to_bson(&PaymentStatus::Paid)?,
                        "razorpay_payment_id": razorpay_payment_id,
                        "updated_at": mongodb::bson::DateTime::now()
                    }
                },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn list_unlinked(&self, since: DateTime) -> Result<Vec<Payment>, AppError> {
        let cursor = self
            .payments
            .find(
                doc! { "order_id": null, "created_at": { "$gte": since } },
                None,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_unreconciled_paid(&self) -> Result<Vec<Payment>, AppError> {
        // Records written before the marker existed have no `reconciled` field.
        let cursor = self
            .payments
            .find(
                doc! {
                    "status": to_bson(&PaymentStatus::Paid)?,
                    "reconciled": { "$ne": true }
                },
                None,
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_reconciled(&self, payment_id: &str) -> Result<(), AppError> {
        self.payments
            .update_one(
                doc! { "_id": payment_id },
                doc! { "$set": { "reconciled": true } },
                None,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MongoRepository {
    async fn insert_order(&self, order: &Order) -> Result<(), AppError> {
        self.orders.insert_one(order, None).await?;
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        Ok(self.orders.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, AppError> {
        Ok(self
            .orders
            .find_one(doc! { "payment_id": payment_id }, None)
            .await?)
    }

    async fn transition_status(
        &self,
        id: &str,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool, AppError> {
        let from = from
            .iter()
            .map(to_bson)
            .collect::<Result<Vec<_>, _>>()?;
        let result = self
            .orders
            .update_one(
                doc! { "_id": id, "status": { "$in": from } },
                doc! {
                    "$set": {
                        "status": to_bson(&to)?,
                        "updated_at": mongodb::bson::DateTime::now()
                    }
                },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn list_by_user_and_status(
        &self,
        user_id: &str,
        status: OrderStatus,
    ) -> Result<Vec<Order>, AppError> {
        let cursor = self
            .orders
            .find(
                doc! { "user_id": user_id, "status": to_bson(&status)? },
                newest_first(),
            )
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
