//! Application startup and lifecycle management.

use crate::config::{Config, StoreBackend};
use crate::handlers::{self, orders, products, users};
use crate::services::{
    InMemoryStore, MongoRepository, OrderWorkflow, PaymentGateway, RazorpayClient, Reconciler,
    Stores, UpiService,
};
use axum::{
    http::Request,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{request_id_middleware, RequestId},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub workflow: OrderWorkflow,
    pub stores: Stores,
    /// Present on the MongoDB backend; pinged by `/ready`.
    pub repository: Option<MongoRepository>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::welcome))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/order/create", post(orders::create_order))
        .route("/order/verify", post(orders::verify_payment))
        .route("/order/user/:number", get(orders::list_user_orders))
        .route("/user/create", post(users::create_user))
        .route("/user", get(users::list_users))
        .route(
            "/user/:external_id",
            get(users::get_user).put(users::update_user),
        )
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/categories", get(products::list_categories))
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Wraps the trace layer so its span can read the id.
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect the configured store and the Razorpay client, then bind.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let (stores, repository) = match config.database.backend {
            StoreBackend::Mongo => {
                let mut client_options =
                    ClientOptions::parse(config.database.url.expose_secret())
                        .await
                        .map_err(|e| {
                            tracing::error!("Failed to parse MongoDB connection string: {}", e);
                            AppError::DatabaseError(e.into())
                        })?;
                client_options.app_name = Some(config.service_name.clone());

                let client = Client::with_options(client_options).map_err(|e| {
                    tracing::error!("Failed to create MongoDB client: {}", e);
                    AppError::DatabaseError(e.into())
                })?;
                let repository = MongoRepository::new(&client.database(&config.database.db_name));

                repository.init_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    e
                })?;

                (Stores::shared(Arc::new(repository.clone())), Some(repository))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                (Stores::shared(Arc::new(InMemoryStore::new())), None)
            }
        };

        let razorpay = RazorpayClient::new(config.razorpay.clone()).map_err(|e| {
            tracing::error!("Failed to build Razorpay client: {}", e);
            AppError::ConfigError(e)
        })?;
        if razorpay.is_configured() {
            tracing::info!("Razorpay client initialized");
        } else {
            tracing::warn!("Razorpay credentials not configured - gateway orders will fail");
        }

        Self::build_with(config, stores, repository, Arc::new(razorpay)).await
    }

    /// Bind with explicit stores and gateway.
    pub async fn build_with(
        config: Config,
        stores: Stores,
        repository: Option<MongoRepository>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, AppError> {
        let upi = UpiService::from_config(&config.upi);
        let workflow = OrderWorkflow::new(stores.clone(), gateway, upi, config.orders.clone());

        let state = AppState {
            config: config.clone(),
            workflow,
            stores,
            repository,
        };

        let host: std::net::IpAddr = config.server.host.parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid host '{}': {}",
                config.server.host,
                e
            ))
        })?;
        // Port 0 = random port for testing
        let addr = SocketAddr::new(host, config.server.port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Order service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until Ctrl+C / SIGTERM, running the reconciliation sweep alongside.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let reconciler = Reconciler::new(
            self.state.stores.clone(),
            self.state.config.orders.reconcile_lookback,
        );
        let shutdown_token = reconciler.shutdown_token();
        let sweep = self
            .state
            .config
            .orders
            .reconcile_interval
            .map(|interval| tokio::spawn(reconciler.start(interval)));

        let router = build_router(self.state);
        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        shutdown_token.cancel();
        if let Some(handle) = sweep {
            if let Err(e) = handle.await {
                tracing::error!("Reconciliation task failed: {}", e);
            }
        }

        result.map_err(|e| {
            tracing::error!("HTTP server error: {}", e);
            e
        })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
