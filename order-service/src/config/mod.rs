use dotenvy::dotenv;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub razorpay: RazorpayConfig,
    pub orders: OrderConfig,
    pub upi: UpiConfig,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown STORE_BACKEND '{}', expected 'mongo' or 'memory'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub api_base_url: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct OrderConfig {
    pub currency: String,
    /// Upper bound on a gateway intent call; expiry counts as unavailable.
    pub gateway_timeout: Duration,
    /// `None` disables the background sweep.
    pub reconcile_interval: Option<Duration>,
    /// How far back a sweep looks for unlinked payments. Paid payments with
    /// no order are given up on once they are older than this.
    pub reconcile_lookback: Duration,
}

#[derive(Clone, Debug)]
pub struct UpiConfig {
    /// Payee virtual payment address; no UPI link is offered when unset.
    pub vpa: Option<String>,
    pub merchant_name: String,
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => default.map(str::to_string).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("{} must be set", key))
        }),
    }
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default))?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let common = core_config::Config::load()?;

        let host = get_env("ORDER_SERVICE_HOST", Some("0.0.0.0"))?;
        let port = parse_env("PORT", &common.port.to_string())?;

        let backend: StoreBackend = get_env("STORE_BACKEND", Some("mongo"))?.parse()?;
        let db_url = match backend {
            StoreBackend::Mongo => get_env("MONGO_URI", None)?,
            StoreBackend::Memory => String::new(),
        };
        let db_name = get_env("MONGO_DATABASE", Some("grocery"))?;

        let gateway_timeout = Duration::from_secs(parse_env("RAZORPAY_TIMEOUT_SECONDS", "10")?);
        let reconcile_seconds: u64 = parse_env("RECONCILE_INTERVAL_SECONDS", "300")?;
        let lookback_hours: u64 = parse_env("RECONCILE_LOOKBACK_HOURS", "24")?;

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                backend,
                url: Secret::new(db_url),
                db_name,
            },
            razorpay: RazorpayConfig {
                key_id: get_env("RAZORPAY_KEY_ID", Some(""))?,
                key_secret: Secret::new(get_env("RAZORPAY_KEY_SECRET", Some(""))?),
                api_base_url: get_env(
                    "RAZORPAY_API_BASE_URL",
                    Some("https://api.razorpay.com/v1"),
                )?,
                timeout: gateway_timeout,
            },
            orders: OrderConfig {
                currency: get_env("ORDER_CURRENCY", Some("INR"))?,
                gateway_timeout,
                reconcile_interval: (reconcile_seconds > 0)
                    .then(|| Duration::from_secs(reconcile_seconds)),
                reconcile_lookback: Duration::from_secs(lookback_hours * 3600),
            },
            upi: UpiConfig {
                vpa: env::var("UPI_VPA").ok().filter(|v| !v.is_empty()),
                merchant_name: get_env("UPI_MERCHANT_NAME", Some("ShopNgo"))?,
            },
            service_name: "order-service".to_string(),
            log_level: get_env("LOG_LEVEL", Some(&common.log_level))?,
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_backend() {
        assert_eq!("mongo".parse::<StoreBackend>().unwrap(), StoreBackend::Mongo);
        assert_eq!("MongoDB".parse::<StoreBackend>().unwrap(), StoreBackend::Mongo);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn missing_required_value_is_a_config_error() {
        let err = get_env("ORDER_SERVICE_TEST_SURELY_UNSET_KEY", None).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert_eq!(
            get_env("ORDER_SERVICE_TEST_SURELY_UNSET_KEY", Some("x")).unwrap(),
            "x"
        );
    }

    #[test]
    fn unparsable_number_is_a_config_error() {
        let err = parse_env::<u16>("ORDER_SERVICE_TEST_SURELY_UNSET_KEY", "not-a-port").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
