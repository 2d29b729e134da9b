use crate::models::Money;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    /// Routed through the Razorpay checkout.
    #[serde(rename = "razorpay", alias = "gateway-routed")]
    Razorpay,
    /// Direct UPI transfer, settled outside the gateway.
    #[serde(rename = "upi", alias = "direct-transfer")]
    Upi,
    #[serde(rename = "cod", alias = "cash-on-delivery")]
    Cod,
}

impl PaymentMethod {
    /// Whether a gateway intent and a payment record are created up front.
    pub fn requires_gateway(self) -> bool {
        matches!(self, PaymentMethod::Razorpay)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Razorpay => "razorpay",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Cod => "cod",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Paid,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    pub razorpay_order_id: Option<String>,
    /// Set once the checkout signature has been verified.
    pub razorpay_payment_id: Option<String>,
    /// Backfilled after the order is written.
    pub order_id: Option<String>,
    /// Set once the payment's order is past confirmation; sweeps skip it.
    #[serde(default)]
    pub reconciled: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
