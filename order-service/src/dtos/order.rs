use crate::models::{
    DeliveryAddress, LineItem, Money, Order, OrderStatus, Payment, PaymentMethod, PaymentStatus,
};
use crate::services::gateway::{PaymentVerification, RazorpayOrder};
use crate::services::workflow::{ConfirmedOrder, NewOrder, PlacedOrder};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Buyer's phone number.
    pub number: String,
    pub products: Vec<LineItem>,
    pub total_amount: Money,
    pub method: PaymentMethod,
    pub delivery_address: DeliveryAddress,
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(req: CreateOrderRequest) -> Self {
        Self {
            buyer: req.number,
            products: req.products,
            total_amount: req.total_amount,
            method: req.method,
            delivery_address: req.delivery_address,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub products: Vec<LineItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_id: Option<String>,
    pub delivery_address: DeliveryAddress,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            products: o.products,
            total_amount: o.total_amount,
            status: o.status,
            payment_id: o.payment_id,
            delivery_address: o.delivery_address,
            created_at: o.created_at.to_string(),
            updated_at: o.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub order_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            method: p.method,
            amount: p.amount,
            status: p.status,
            razorpay_order_id: p.razorpay_order_id,
            razorpay_payment_id: p.razorpay_payment_id,
            order_id: p.order_id,
            created_at: p.created_at.to_string(),
            updated_at: p.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order: OrderResponse,
    pub payment: Option<PaymentResponse>,
    /// Raw gateway intent for the client checkout.
    pub razorpay_order: Option<RazorpayOrder>,
    /// Public key the checkout widget is opened with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_link: Option<String>,
}

impl CreateOrderResponse {
    pub fn new(placed: PlacedOrder, key_id: &str) -> Self {
        let razorpay_key_id = placed.gateway_order.as_ref().map(|_| key_id.to_string());
        Self {
            order: placed.order.into(),
            payment: placed.payment.map(Into::into),
            razorpay_order: placed.gateway_order,
            razorpay_key_id,
            upi_link: placed.upi_link,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, message = "razorpay_order_id is required"))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1, message = "razorpay_payment_id is required"))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1, message = "razorpay_signature is required"))]
    pub razorpay_signature: String,
}

impl From<VerifyPaymentRequest> for PaymentVerification {
    fn from(req: VerifyPaymentRequest) -> Self {
        Self {
            razorpay_order_id: req.razorpay_order_id,
            razorpay_payment_id: req.razorpay_payment_id,
            razorpay_signature: req.razorpay_signature,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_confirmed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProductSnapshotResponse {
    pub name: String,
    pub price: Money,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedItemResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
    /// Live catalog name/price; absent when the product no longer exists.
    pub product: Option<ProductSnapshotResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummaryResponse {
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedOrderResponse {
    pub id: String,
    pub products: Vec<ConfirmedItemResponse>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment: Option<PaymentSummaryResponse>,
    pub delivery_address: DeliveryAddress,
    pub created_at: String,
}

impl From<ConfirmedOrder> for ConfirmedOrderResponse {
    fn from(c: ConfirmedOrder) -> Self {
        Self {
            id: c.order.id,
            products: c
                .items
                .into_iter()
                .map(|i| ConfirmedItemResponse {
                    product_id: i.item.product_id,
                    name: i.item.name,
                    quantity: i.item.quantity,
                    price: i.item.price,
                    product: i.product.map(|p| ProductSnapshotResponse {
                        name: p.name,
                        price: p.price,
                    }),
                })
                .collect(),
            total_amount: c.order.total_amount,
            status: c.order.status,
            payment: c.payment.map(|p| PaymentSummaryResponse {
                method: p.method,
                amount: p.amount,
                status: p.status,
            }),
            delivery_address: c.order.delivery_address,
            created_at: c.order.created_at.to_string(),
        }
    }
}
