//! [`PaymentGateway`] backed by Razorpay's Orders API over HTTPS.

use crate::config::RazorpayConfig;
use crate::services::gateway::{PaymentGateway, PaymentVerification, RazorpayOrder};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::utils::signature::verify_hmac_sha256_hex;

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

/// Request to create a Razorpay order.
#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Amount in smallest currency unit (paise for INR).
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
}

/// Razorpay API error response.
#[derive(Debug, Deserialize)]
struct RazorpayError {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    code: String,
    description: String,
}

impl RazorpayClient {
    /// Create a new Razorpay client. Every request is bounded by the
    /// configured timeout.
    pub fn new(config: RazorpayConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Both key id and secret are present.
    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn key_id(&self) -> &str {
        &self.config.key_id
    }

    async fn create_order(
        &self,
        amount: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<RazorpayOrder> {
        if !self.is_configured() {
            return Err(anyhow!("Razorpay credentials not configured"));
        }

        let request = CreateOrderRequest {
            amount,
            currency,
            receipt,
        };

        let url = format!("{}/orders", self.config.api_base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Razorpay create_order response");

        if status.is_success() {
            let order: RazorpayOrder = serde_json::from_str(&body)?;
            tracing::info!(
                razorpay_order_id = %order.id,
                amount = order.amount,
                currency = %order.currency,
                "Razorpay order created"
            );
            Ok(order)
        } else {
            let (code, description) = match serde_json::from_str::<RazorpayError>(&body) {
                Ok(error) => (error.error.code, error.error.description),
                Err(_) => ("UNKNOWN".to_string(), format!("HTTP {}", status)),
            };
            tracing::error!(
                code = %code,
                description = %description,
                "Razorpay order creation failed"
            );
            Err(anyhow!("Razorpay error: {} - {}", code, description))
        }
    }

    /// The signature is computed as:
    /// `HMAC-SHA256(order_id + "|" + payment_id, key_secret)`
    fn verify_payment_signature(&self, verification: &PaymentVerification) -> Result<bool> {
        let is_valid = verify_hmac_sha256_hex(
            self.config.key_secret.expose_secret(),
            &verification.payload(),
            &verification.razorpay_signature,
        )?;

        if is_valid {
            tracing::info!(
                razorpay_order_id = %verification.razorpay_order_id,
                razorpay_payment_id = %verification.razorpay_payment_id,
                "Payment signature verified successfully"
            );
        } else {
            tracing::warn!(
                razorpay_order_id = %verification.razorpay_order_id,
                razorpay_payment_id = %verification.razorpay_payment_id,
                "Payment signature verification failed"
            );
        }

        Ok(is_valid)
    }
}
