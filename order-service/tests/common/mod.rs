#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use order_service::config::{
    Config, DatabaseConfig, OrderConfig, RazorpayConfig, ServerConfig, StoreBackend, UpiConfig,
};
use order_service::services::{InMemoryStore, MockGateway, OrderWorkflow, Stores, UpiService};
use order_service::{build_router, AppState};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const KEY_SECRET: &str = "test_key_secret";
pub const BUYER: &str = "+911234567890";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: Secret::new(String::new()),
            db_name: "grocery_test".to_string(),
        },
        razorpay: RazorpayConfig {
            key_id: "rzp_test_mock".to_string(),
            key_secret: Secret::new(KEY_SECRET.to_string()),
            api_base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(1),
        },
        orders: OrderConfig {
            currency: "INR".to_string(),
            gateway_timeout: Duration::from_millis(500),
            reconcile_interval: None,
            reconcile_lookback: Duration::from_secs(24 * 3600),
        },
        upi: UpiConfig {
            vpa: Some("shopngo@upi".to_string()),
            merchant_name: "ShopNgo".to_string(),
        },
        service_name: "order-service".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
    }
}

/// Router over the in-memory store and the mock gateway.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<MockGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(MockGateway::new(KEY_SECRET))
    }

    pub fn with_gateway(gateway: MockGateway) -> Self {
        let config = test_config();
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(gateway);
        let stores = Stores::shared(store.clone());

        let workflow = OrderWorkflow::new(
            stores.clone(),
            gateway.clone(),
            UpiService::from_config(&config.upi),
            config.orders.clone(),
        );
        let state = AppState {
            config,
            workflow,
            stores,
            repository: None,
        };

        Self {
            router: build_router(state),
            store,
            gateway,
        }
    }

    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("PUT", uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request("DELETE", uri, None).await
    }

    pub async fn create_user(&self, number: &str, external_id: &str) -> Value {
        let (status, body) = self
            .post(
                "/user/create",
                json!({
                    "externalId": external_id,
                    "number": number,
                    "name": "Asha Rao",
                    "addresses": [{
                        "line1": "12 MG Road",
                        "city": "Bengaluru",
                        "state": "KA",
                        "pincode": "560001"
                    }]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }
}

pub fn delivery_address() -> Value {
    json!({
        "name": "Asha Rao",
        "phone": "9876543210",
        "addressLine1": "12 MG Road",
        "city": "Bengaluru",
        "state": "KA",
        "pincode": "560001"
    })
}

/// Rice 5kg × 2 at 250.00.
pub fn rice_order(method: &str) -> Value {
    json!({
        "number": BUYER,
        "products": [{
            "productId": "rice-5kg",
            "name": "Rice 5kg",
            "quantity": 2,
            "price": "250.00"
        }],
        "totalAmount": 500,
        "method": method,
        "deliveryAddress": delivery_address()
    })
}
