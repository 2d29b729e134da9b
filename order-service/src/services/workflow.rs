//! Order placement, payment verification and the confirmed-orders query.
//!
//! Payment and order records are written in separate steps without a
//! multi-document transaction. The two windows this leaves open (a payment
//! not yet linked to its order, and a paid payment whose order is still
//! unconfirmed) are logged here and repaired by [`crate::services::reconciliation`].

use crate::config::OrderConfig;
use crate::models::{
    line_items_total, new_id, DeliveryAddress, LineItem, Money, Order, OrderStatus, Payment,
    PaymentMethod, PaymentStatus, Product,
};
use crate::services::gateway::{new_receipt_id, PaymentGateway, PaymentVerification, RazorpayOrder};
use crate::services::metrics::{record_order_placed, record_verification};
use crate::services::store::{Stores, UserDirectory};
use crate::services::upi::UpiService;
use mongodb::bson::DateTime;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

/// A checkout request after it has been decoded at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Buyer's phone number.
    pub buyer: String,
    pub products: Vec<LineItem>,
    pub total_amount: Money,
    pub method: PaymentMethod,
    pub delivery_address: DeliveryAddress,
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment: Option<Payment>,
    /// What the client needs to open the checkout.
    pub gateway_order: Option<RazorpayOrder>,
    pub upi_link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub payment: Payment,
    /// `false` when the order could not be moved to `confirmed` in this call.
    pub order_confirmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSummary {
    pub id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone)]
pub struct ConfirmedLineItem {
    pub item: LineItem,
    /// Current catalog entry, `None` once the product has been deleted.
    pub product: Option<ProductSummary>,
}

#[derive(Debug, Clone)]
pub struct ConfirmedOrder {
    pub order: Order,
    pub items: Vec<ConfirmedLineItem>,
    pub payment: Option<PaymentSummary>,
}

#[derive(Clone)]
pub struct OrderWorkflow {
    stores: Stores,
    gateway: Arc<dyn PaymentGateway>,
    upi: Option<UpiService>,
    config: OrderConfig,
}

impl OrderWorkflow {
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        upi: Option<UpiService>,
        config: OrderConfig,
    ) -> Self {
        Self {
            stores,
            gateway,
            upi,
            config,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.gateway
    }

    /// Place an order for an existing buyer.
    ///
    /// For gateway-routed payments the remote intent is created before any
    /// record is written, so a gateway failure leaves nothing behind.
    pub async fn place_order(&self, request: NewOrder) -> Result<PlacedOrder, AppError> {
        let NewOrder {
            buyer,
            products,
            total_amount,
            method,
            delivery_address,
        } = request;

        validate_items(&products)?;
        delivery_address.validate()?;

        let user = resolve_buyer(self.stores.users.as_ref(), &buyer).await?;

        let expected = line_items_total(&products)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid line items: {}", e)))?;
        if expected != total_amount {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Total amount {} does not match line items total {}",
                total_amount,
                expected
            )));
        }

        let now = DateTime::now();
        let mut gateway_order = None;
        let mut payment = None;

        if method.requires_gateway() {
            let razorpay_order = self.create_gateway_intent(total_amount).await?;

            let record = Payment {
                id: new_id(),
                method,
                amount: total_amount,
                status: PaymentStatus::Created,
                razorpay_order_id: Some(razorpay_order.id.clone()),
                razorpay_payment_id: None,
                order_id: None,
                reconciled: false,
                created_at: now,
                updated_at: now,
            };
            self.stores.payments.insert_payment(&record).await?;

            tracing::info!(
                payment_id = %record.id,
                razorpay_order_id = %razorpay_order.id,
                amount = %total_amount,
                "Payment intent recorded"
            );

            gateway_order = Some(razorpay_order);
            payment = Some(record);
        }

        let order = Order {
            id: new_id(),
            user_id: user.id.clone(),
            products,
            total_amount,
            status: match method {
                PaymentMethod::Cod => OrderStatus::Pending,
                _ => OrderStatus::Created,
            },
            payment_id: payment.as_ref().map(|p| p.id.clone()),
            delivery_address,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.stores.orders.insert_order(&order).await {
            if let Some(payment) = &payment {
                tracing::error!(
                    payment_id = %payment.id,
                    error = %e,
                    "Order write failed after payment intent was recorded"
                );
            }
            return Err(e);
        }

        if let Some(payment) = payment.as_mut() {
            match self.stores.payments.link_order(&payment.id, &order.id).await {
                Ok(()) => payment.order_id = Some(order.id.clone()),
                Err(e) => tracing::error!(
                    payment_id = %payment.id,
                    order_id = %order.id,
                    error = %e,
                    "Failed to link payment to order; left for reconciliation"
                ),
            }
        }

        let upi_link = match (method, &self.upi) {
            (PaymentMethod::Upi, Some(upi)) => Some(upi.generate_upi_link(
                total_amount,
                &self.config.currency,
                "Grocery order",
                &order.id,
            )),
            _ => None,
        };

        record_order_placed(method.as_str());
        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            method = %method,
            status = %order.status,
            total = %order.total_amount,
            "Order placed"
        );

        Ok(PlacedOrder {
            order,
            payment,
            gateway_order,
            upi_link,
        })
    }

    async fn create_gateway_intent(&self, amount: Money) -> Result<RazorpayOrder, AppError> {
        let minor_units = amount
            .to_minor_units()
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid amount: {}", e)))?;
        if minor_units == 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Amount must be greater than zero for gateway payments"
            )));
        }

        let receipt = new_receipt_id();
        let call = self
            .gateway
            .create_order(minor_units, &self.config.currency, &receipt);

        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(Ok(order)) => Ok(order),
            Ok(Err(e)) => {
                tracing::error!(receipt = %receipt, error = %e, "Gateway intent creation failed");
                Err(AppError::GatewayUnavailable(e))
            }
            Err(_) => {
                tracing::error!(
                    receipt = %receipt,
                    timeout = ?self.config.gateway_timeout,
                    "Gateway intent creation timed out"
                );
                Err(AppError::GatewayUnavailable(anyhow::anyhow!(
                    "Gateway did not answer within {:?}",
                    self.config.gateway_timeout
                )))
            }
        }
    }

    /// Check a checkout callback and settle the payment and its order.
    ///
    /// A signature mismatch changes nothing and yields
    /// [`AppError::InvalidSignature`]. The payment is marked paid before the
    /// order is confirmed; a failed confirmation is logged, not returned.
    pub async fn verify_payment(
        &self,
        verification: PaymentVerification,
    ) -> Result<VerifiedPayment, AppError> {
        let mut payment = self
            .stores
            .payments
            .find_by_razorpay_order_id(&verification.razorpay_order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;

        let valid = self
            .gateway
            .verify_payment_signature(&verification)
            .map_err(AppError::InternalError)?;
        if !valid {
            record_verification("invalid");
            tracing::warn!(
                payment_id = %payment.id,
                razorpay_order_id = %verification.razorpay_order_id,
                "Payment signature mismatch"
            );
            return Err(AppError::InvalidSignature);
        }

        match payment.status {
            PaymentStatus::Created => {
                let applied = self
                    .stores
                    .payments
                    .mark_paid(&payment.id, &verification.razorpay_payment_id)
                    .await?;
                if applied {
                    payment.status = PaymentStatus::Paid;
                    payment.razorpay_payment_id = Some(verification.razorpay_payment_id.clone());
                    payment.updated_at = DateTime::now();
                } else {
                    // Another verification settled it between our read and write.
                    payment = self
                        .stores
                        .payments
                        .get_payment(&payment.id)
                        .await?
                        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;
                    ensure_settled_by(&payment, &verification)?;
                }
            }
            _ => ensure_settled_by(&payment, &verification)?,
        }

        record_verification("verified");
        let order_confirmed = self.confirm_order_for(&payment).await;
        if order_confirmed && !payment.reconciled {
            if let Err(e) = self.stores.payments.mark_reconciled(&payment.id).await {
                tracing::warn!(payment_id = %payment.id, error = %e, "Failed to mark payment reconciled");
            }
        }

        Ok(VerifiedPayment {
            payment,
            order_confirmed,
        })
    }

    /// Move the payment's order to `confirmed`. Failures are logged and
    /// reported as `false`; the paid payment stays the record of truth.
    async fn confirm_order_for(&self, payment: &Payment) -> bool {
        let order = match &payment.order_id {
            Some(order_id) => self.stores.orders.get_order(order_id).await,
            // Link backfill may not have happened yet.
            None => self.stores.orders.find_by_payment_id(&payment.id).await,
        };

        let order = match order {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!(payment_id = %payment.id, "No order found for paid payment");
                return false;
            }
            Err(e) => {
                tracing::error!(
                    payment_id = %payment.id,
                    error = %e,
                    "Failed to load order for paid payment"
                );
                return false;
            }
        };

        if order.status == OrderStatus::Confirmed {
            return true;
        }

        match self
            .stores
            .orders
            .transition_status(
                &order.id,
                &OrderStatus::sources_for(OrderStatus::Confirmed),
                OrderStatus::Confirmed,
            )
            .await
        {
            Ok(true) => {
                tracing::info!(order_id = %order.id, payment_id = %payment.id, "Order confirmed");
                true
            }
            Ok(false) => {
                tracing::warn!(
                    order_id = %order.id,
                    status = %order.status,
                    "Order not in a confirmable state"
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order.id,
                    payment_id = %payment.id,
                    error = %e,
                    "Payment is paid but order confirmation failed"
                );
                false
            }
        }
    }

    /// Confirmed orders for the buyer with this phone number, newest first.
    pub async fn list_confirmed_orders_for_user(
        &self,
        buyer: &str,
    ) -> Result<Vec<ConfirmedOrder>, AppError> {
        let user = resolve_buyer(self.stores.users.as_ref(), buyer).await?;

        let orders = self
            .stores
            .orders
            .list_by_user_and_status(&user.id, OrderStatus::Confirmed)
            .await?;
        if orders.is_empty() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "No confirmed orders found for this user"
            )));
        }

        let mut product_ids: Vec<String> = orders
            .iter()
            .flat_map(|o| o.products.iter().map(|i| i.product_id.clone()))
            .collect();
        product_ids.sort();
        product_ids.dedup();
        let products: HashMap<String, Product> = self
            .stores
            .products
            .get_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let payment_ids: Vec<String> = orders.iter().filter_map(|o| o.payment_id.clone()).collect();
        let payments: HashMap<String, Payment> = if payment_ids.is_empty() {
            HashMap::new()
        } else {
            self.stores
                .payments
                .get_payments(&payment_ids)
                .await?
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect()
        };

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = order
                    .products
                    .iter()
                    .map(|item| ConfirmedLineItem {
                        item: item.clone(),
                        product: products.get(&item.product_id).map(|p| ProductSummary {
                            id: p.id.clone(),
                            name: p.name.clone(),
                            price: p.price,
                        }),
                    })
                    .collect();
                let payment = order
                    .payment_id
                    .as_ref()
                    .and_then(|id| payments.get(id))
                    .map(|p| PaymentSummary {
                        id: p.id.clone(),
                        method: p.method,
                        amount: p.amount,
                        status: p.status,
                    });
                ConfirmedOrder {
                    order,
                    items,
                    payment,
                }
            })
            .collect())
    }
}

async fn resolve_buyer(
    users: &dyn UserDirectory,
    number: &str,
) -> Result<crate::models::User, AppError> {
    users
        .find_by_number(number.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))
}

/// Accept a repeat verification of an already-paid payment only when it
/// carries the gateway payment id that settled it.
fn ensure_settled_by(payment: &Payment, verification: &PaymentVerification) -> Result<(), AppError> {
    match payment.status {
        PaymentStatus::Paid
            if payment.razorpay_payment_id.as_deref()
                == Some(verification.razorpay_payment_id.as_str()) =>
        {
            tracing::info!(payment_id = %payment.id, "Payment already verified");
            Ok(())
        }
        PaymentStatus::Paid => Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment already settled with a different payment id"
        ))),
        status => Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment is {:?} and cannot be settled",
            status
        ))),
    }
}

fn validate_items(items: &[LineItem]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Order must contain at least one product"
        )));
    }
    for item in items {
        item.validate()?;
    }
    Ok(())
}
