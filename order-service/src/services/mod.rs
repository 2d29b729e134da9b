pub mod gateway;
pub mod memory;
pub mod metrics;
pub mod razorpay;
pub mod reconciliation;
pub mod repository;
pub mod store;
pub mod upi;
pub mod workflow;

pub use gateway::{MockGateway, PaymentGateway, PaymentVerification, RazorpayOrder};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use razorpay::RazorpayClient;
pub use reconciliation::{ReconcileReport, Reconciler};
pub use repository::MongoRepository;
pub use store::{OrderStore, PaymentStore, ProductCatalog, Stores, UserDirectory};
pub use upi::UpiService;
pub use workflow::OrderWorkflow;
