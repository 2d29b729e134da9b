use crate::models::{OrderStatus, Payment};
use crate::services::metrics::record_repair;
use crate::services::store::Stores;
use mongodb::bson::DateTime;
use service_core::error::AppError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub links_repaired: u64,
    pub orders_confirmed: u64,
}

enum Settlement {
    Confirmed,
    AlreadySettled,
    Abandoned,
    Pending,
}

/// Repairs the payment/order pairs left half-written by a failed second write.
pub struct Reconciler {
    stores: Stores,
    lookback: Duration,
    shutdown_token: CancellationToken,
}

impl Reconciler {
    pub fn new(stores: Stores, lookback: Duration) -> Self {
        Self {
            stores,
            lookback,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops [`Reconciler::start`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    fn cutoff(&self) -> DateTime {
        let lookback = i64::try_from(self.lookback.as_millis()).unwrap_or(i64::MAX);
        DateTime::from_millis(DateTime::now().timestamp_millis().saturating_sub(lookback))
    }

    /// One pass: backfill missing payment→order links for recent payments,
    /// then confirm orders whose payment is already paid. Pairs that need no
    /// further work are marked so later passes skip them. Per-record failures
    /// are logged and skipped.
    pub async fn sweep(&self) -> Result<ReconcileReport, AppError> {
        let mut report = ReconcileReport::default();
        let cutoff = self.cutoff();

        for payment in self.stores.payments.list_unlinked(cutoff).await? {
            let order = match self.stores.orders.find_by_payment_id(&payment.id).await {
                Ok(Some(order)) => order,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(payment_id = %payment.id, error = %e, "Order lookup failed");
                    continue;
                }
            };

            match self.stores.payments.link_order(&payment.id, &order.id).await {
                Ok(()) => {
                    tracing::info!(payment_id = %payment.id, order_id = %order.id, "Payment link repaired");
                    report.links_repaired += 1;
                }
                Err(e) => {
                    tracing::warn!(payment_id = %payment.id, error = %e, "Payment link repair failed")
                }
            }
        }

        for payment in self.stores.payments.list_unreconciled_paid().await? {
            match self.settle(&payment, cutoff).await {
                Ok(Settlement::Confirmed) => report.orders_confirmed += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(payment_id = %payment.id, error = %e, "Order confirmation repair failed")
                }
            }
        }

        if report.links_repaired > 0 {
            record_repair("payment_link", report.links_repaired);
        }
        if report.orders_confirmed > 0 {
            record_repair("order_confirmation", report.orders_confirmed);
        }

        Ok(report)
    }

    async fn settle(&self, payment: &Payment, cutoff: DateTime) -> Result<Settlement, AppError> {
        let order = match &payment.order_id {
            Some(order_id) => self.stores.orders.get_order(order_id).await?,
            None => self.stores.orders.find_by_payment_id(&payment.id).await?,
        };
        let Some(order) = order else {
            if payment.updated_at < cutoff {
                tracing::warn!(payment_id = %payment.id, "Paid payment has no order; giving up");
                self.stores.payments.mark_reconciled(&payment.id).await?;
                return Ok(Settlement::Abandoned);
            }
            return Ok(Settlement::Pending);
        };

        let sources = OrderStatus::sources_for(OrderStatus::Confirmed);
        let outcome = if !sources.contains(&order.status) {
            Settlement::AlreadySettled
        } else if self
            .stores
            .orders
            .transition_status(&order.id, &sources, OrderStatus::Confirmed)
            .await?
        {
            tracing::info!(order_id = %order.id, payment_id = %payment.id, "Paid order confirmed by sweep");
            Settlement::Confirmed
        } else {
            // Moved on concurrently; picked up again next pass.
            return Ok(Settlement::Pending);
        };

        self.stores.payments.mark_reconciled(&payment.id).await?;
        Ok(outcome)
    }

    /// Run [`Reconciler::sweep`] every `interval` until the shutdown token fires.
    pub async fn start(self, interval: Duration) {
        tracing::info!(interval = ?interval, "Starting reconciliation sweep");

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so startup is not a sweep.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Reconciliation sweep stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(report) if report != ReconcileReport::default() => {
                            tracing::info!(
                                links_repaired = report.links_repaired,
                                orders_confirmed = report.orders_confirmed,
                                "Reconciliation sweep repaired records"
                            );
                        }
                        Ok(_) => tracing::debug!("Reconciliation sweep found nothing to repair"),
                        Err(e) => tracing::error!(error = %e, "Reconciliation sweep failed"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DeliveryAddress, LineItem, Money, Order, PaymentMethod, PaymentStatus,
    };
    use crate::services::memory::InMemoryStore;
    use crate::services::store::{OrderStore, PaymentStore};
    use mongodb::bson::DateTime;
    use std::sync::Arc;

    const LOOKBACK: Duration = Duration::from_secs(24 * 3600);

    fn payment(id: &str, status: PaymentStatus, order_id: Option<&str>) -> Payment {
        let now = DateTime::now();
        Payment {
            id: id.to_string(),
            method: PaymentMethod::Razorpay,
            amount: Money::parse("120").unwrap(),
            status,
            razorpay_order_id: Some(format!("order_{}", id)),
            razorpay_payment_id: (status == PaymentStatus::Paid).then(|| format!("pay_{}", id)),
            order_id: order_id.map(str::to_string),
            reconciled: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn order(id: &str, payment_id: &str, status: OrderStatus) -> Order {
        let now = DateTime::now();
        Order {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            products: vec![LineItem {
                product_id: "milk".to_string(),
                name: "Milk 1L".to_string(),
                quantity: 2,
                price: Money::parse("60").unwrap(),
            }],
            total_amount: Money::parse("120").unwrap(),
            status,
            payment_id: Some(payment_id.to_string()),
            delivery_address: DeliveryAddress {
                name: "Ravi".to_string(),
                phone: "9876543210".to_string(),
                address_line1: "4 Lake View".to_string(),
                address_line2: None,
                city: "Pune".to_string(),
                state: "MH".to_string(),
                pincode: "411001".to_string(),
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn repairs_links_and_confirms_paid_orders() {
        let store = Arc::new(InMemoryStore::new());
        // Unlinked and unpaid.
        store.insert_payment(&payment("p1", PaymentStatus::Created, None)).await.unwrap();
        store.insert_order(&order("o1", "p1", OrderStatus::Created)).await.unwrap();
        // Paid but the order was never confirmed.
        store.insert_payment(&payment("p2", PaymentStatus::Paid, Some("o2"))).await.unwrap();
        store.insert_order(&order("o2", "p2", OrderStatus::Created)).await.unwrap();
        // Paid and already consistent.
        store.insert_payment(&payment("p3", PaymentStatus::Paid, Some("o3"))).await.unwrap();
        store.insert_order(&order("o3", "p3", OrderStatus::Confirmed)).await.unwrap();
        // Intent with no order at all.
        store.insert_payment(&payment("p4", PaymentStatus::Created, None)).await.unwrap();

        let reconciler = Reconciler::new(Stores::shared(store.clone()), LOOKBACK);
        let report = reconciler.sweep().await.unwrap();

        assert_eq!(
            report,
            ReconcileReport {
                links_repaired: 1,
                orders_confirmed: 1
            }
        );
        let p1 = store.get_payment("p1").await.unwrap().unwrap();
        assert_eq!(p1.order_id.as_deref(), Some("o1"));
        assert_eq!(
            store.get_order("o1").await.unwrap().unwrap().status,
            OrderStatus::Created
        );
        assert_eq!(
            store.get_order("o2").await.unwrap().unwrap().status,
            OrderStatus::Confirmed
        );

        // Both paid pairs are settled and drop out of later passes.
        assert!(store.list_unreconciled_paid().await.unwrap().is_empty());
        assert!(store.get_payment("p3").await.unwrap().unwrap().reconciled);
        assert_eq!(reconciler.sweep().await.unwrap(), ReconcileReport::default());
    }

    #[tokio::test]
    async fn settled_pairs_are_not_revisited() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_payment(&payment("p1", PaymentStatus::Paid, Some("o1"))).await.unwrap();
        store.insert_order(&order("o1", "p1", OrderStatus::Created)).await.unwrap();
        let reconciler = Reconciler::new(Stores::shared(store.clone()), LOOKBACK);

        assert_eq!(reconciler.sweep().await.unwrap().orders_confirmed, 1);

        // Cancelling the order afterwards is not undone or re-examined.
        store
            .transition_status("o1", &[OrderStatus::Confirmed], OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(reconciler.sweep().await.unwrap(), ReconcileReport::default());
        assert!(store.list_unreconciled_paid().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unlinked_payments_older_than_lookback_are_ignored() {
        let store = Arc::new(InMemoryStore::new());
        let mut stale = payment("p1", PaymentStatus::Created, None);
        stale.created_at = DateTime::from_millis(0);
        stale.updated_at = stale.created_at;
        store.insert_payment(&stale).await.unwrap();
        store.insert_order(&order("o1", "p1", OrderStatus::Created)).await.unwrap();

        let report = Reconciler::new(Stores::shared(store.clone()), LOOKBACK)
            .sweep()
            .await
            .unwrap();

        assert_eq!(report.links_repaired, 0);
        assert!(store.get_payment("p1").await.unwrap().unwrap().order_id.is_none());
    }

    #[tokio::test]
    async fn orphaned_paid_payments_are_abandoned_after_lookback() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_payment(&payment("recent", PaymentStatus::Paid, None)).await.unwrap();
        let mut old = payment("old", PaymentStatus::Paid, None);
        old.created_at = DateTime::from_millis(0);
        old.updated_at = old.created_at;
        store.insert_payment(&old).await.unwrap();

        Reconciler::new(Stores::shared(store.clone()), LOOKBACK)
            .sweep()
            .await
            .unwrap();

        let remaining = store.list_unreconciled_paid().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "recent");
    }

    #[tokio::test]
    async fn cancelled_orders_are_not_confirmed() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_payment(&payment("p1", PaymentStatus::Paid, Some("o1"))).await.unwrap();
        store.insert_order(&order("o1", "p1", OrderStatus::Cancelled)).await.unwrap();

        let report = Reconciler::new(Stores::shared(store.clone()), LOOKBACK).sweep().await.unwrap();

        assert_eq!(report.orders_confirmed, 0);
        assert_eq!(
            store.get_order("o1").await.unwrap().unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn stops_when_token_is_cancelled() {
        let reconciler = Reconciler::new(Stores::shared(Arc::new(InMemoryStore::new())), LOOKBACK);
        let token = reconciler.shutdown_token();
        let handle = tokio::spawn(reconciler.start(Duration::from_millis(10)));

        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep loop did not stop")
            .unwrap();
    }
}
