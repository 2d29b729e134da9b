use crate::config::UpiConfig;
use crate::models::Money;

/// Builds UPI intent links for direct-transfer orders.
#[derive(Clone, Debug)]
pub struct UpiService {
    vpa: String,
    merchant_name: String,
}

impl UpiService {
    /// `None` when no payee VPA is configured.
    pub fn from_config(config: &UpiConfig) -> Option<Self> {
        config.vpa.as_ref().map(|vpa| Self {
            vpa: vpa.clone(),
            merchant_name: config.merchant_name.clone(),
        })
    }

    /// `upi://pay?pa=..&pn=..&am=..&cu=..&tn=..&tr=..`; `tr` is the order id.
    pub fn generate_upi_link(
        &self,
        amount: Money,
        currency: &str,
        note: &str,
        transaction_ref: &str,
    ) -> String {
        format!(
            "upi://pay?pa={}&pn={}&am={}&cu={}&tn={}&tr={}",
            urlencoding::encode(&self.vpa),
            urlencoding::encode(&self.merchant_name),
            amount,
            urlencoding::encode(currency),
            urlencoding::encode(note),
            urlencoding::encode(transaction_ref)
        )
    }
}
