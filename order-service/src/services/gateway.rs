//! Payment gateway seam.
//!
//! The workflow talks to [`PaymentGateway`]; production wires in
//! [`RazorpayClient`](super::RazorpayClient), tests use [`MockGateway`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::utils::signature::{hmac_sha256_hex, verify_hmac_sha256_hex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Remote payment intent as returned by Razorpay's Orders API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RazorpayOrder {
    pub id: String,
    pub entity: String,
    /// Smallest currency unit.
    pub amount: u64,
    pub amount_paid: u64,
    pub amount_due: u64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
    pub attempts: u32,
    pub notes: Option<serde_json::Value>,
    pub created_at: u64,
}

/// Proof of payment handed back by the client-side checkout.
#[derive(Debug, Clone)]
pub struct PaymentVerification {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

impl PaymentVerification {
    /// Canonical signed message: `order_id|payment_id`.
    pub fn payload(&self) -> String {
        format!("{}|{}", self.razorpay_order_id, self.razorpay_payment_id)
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id the checkout widget is initialised with.
    fn key_id(&self) -> &str;

    /// Create a remote payment intent for `amount` minor units.
    async fn create_order(&self, amount: u64, currency: &str, receipt: &str)
        -> Result<RazorpayOrder>;

    /// Check `HMAC-SHA256(order_id|payment_id, key_secret)` in constant time.
    fn verify_payment_signature(&self, verification: &PaymentVerification) -> Result<bool>;
}

/// Receipt id unique per attempt: millisecond timestamp plus a random suffix.
pub fn new_receipt_id() -> String {
    format!(
        "receipt_{}_{:08x}",
        chrono::Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

/// In-process gateway that signs with a known secret.
pub struct MockGateway {
    key_secret: String,
    fail: bool,
    delay: Option<Duration>,
    created: AtomicUsize,
}

impl MockGateway {
    pub fn new(key_secret: impl Into<String>) -> Self {
        Self {
            key_secret: key_secret.into(),
            fail: false,
            delay: None,
            created: AtomicUsize::new(0),
        }
    }

    /// Every `create_order` call fails as if the gateway were down.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Sleep before answering `create_order`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of intents created so far.
    pub fn created_orders(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Signature the real checkout would hand back for this pair.
    pub fn sign(&self, razorpay_order_id: &str, razorpay_payment_id: &str) -> String {
        hmac_sha256_hex(
            &self.key_secret,
            &format!("{}|{}", razorpay_order_id, razorpay_payment_id),
        )
        .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn key_id(&self) -> &str {
        "rzp_test_mock"
    }

    async fn create_order(
        &self,
        amount: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<RazorpayOrder> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(anyhow!("Mock gateway unavailable"));
        }

        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RazorpayOrder {
            id: format!("order_mock{:06}", n),
            entity: "order".to_string(),
            amount,
            amount_paid: 0,
            amount_due: amount,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: "created".to_string(),
            attempts: 0,
            notes: None,
            created_at: chrono::Utc::now().timestamp().max(0) as u64,
        })
    }

    fn verify_payment_signature(&self, verification: &PaymentVerification) -> Result<bool> {
        verify_hmac_sha256_hex(
            &self.key_secret,
            &verification.payload(),
            &verification.razorpay_signature,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_ids_differ_between_attempts() {
        let a = new_receipt_id();
        let b = new_receipt_id();
        assert!(a.starts_with("receipt_"));
        assert!(a.len() <= 40);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn mock_round_trip() {
        let gateway = MockGateway::new("S");
        let order = gateway.create_order(50_000, "INR", "r1").await.unwrap();
        assert_eq!(order.amount, 50_000);
        assert_eq!(gateway.created_orders(), 1);

        let verification = PaymentVerification {
            razorpay_order_id: order.id.clone(),
            razorpay_payment_id: "pay_xyz".to_string(),
            razorpay_signature: gateway.sign(&order.id, "pay_xyz"),
        };
        assert!(gateway.verify_payment_signature(&verification).unwrap());
    }

    #[tokio::test]
    async fn failing_mock_creates_nothing() {
        let gateway = MockGateway::new("S").failing();
        assert!(gateway.create_order(100, "INR", "r1").await.is_err());
        assert_eq!(gateway.created_orders(), 0);
    }
}
