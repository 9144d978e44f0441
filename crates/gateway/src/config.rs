use common::{env_or, env_parse};

pub use common::Environment;

pub const DEFAULT_IMAGE_URL: &str = "https://www.anufrienko.net/files/djltest.jpg";
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub addr: String,
    /// Image detected by `GET /detect` when no `url` is given.
    pub image_url: String,
    pub fetch_timeout_ms: u64,
    /// Total download attempts, including the first.
    pub fetch_retries: u32,
    /// Cap on both downloaded and uploaded images.
    pub max_image_bytes: usize,
    pub ready_poll_ms: u64,
    pub otel_endpoint: Option<String>,
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        Self {
            environment: Environment::from_env(),
            addr: env_or("GATEWAY_ADDR", "0.0.0.0:8080"),
            image_url: env_or("GATEWAY_IMAGE_URL", DEFAULT_IMAGE_URL),
            fetch_timeout_ms: env_parse("GATEWAY_FETCH_TIMEOUT_MS", 10_000),
            fetch_retries: env_parse("GATEWAY_FETCH_RETRIES", 3),
            max_image_bytes: env_parse("GATEWAY_MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
            ready_poll_ms: env_parse("GATEWAY_READY_POLL_MS", 1_000),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
        }
    }

    /// Create default configuration for testing
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            addr: "127.0.0.1:0".to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            fetch_timeout_ms: 1_000,
            fetch_retries: 1,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            ready_poll_ms: 10,
            otel_endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "GATEWAY_ADDR",
        "GATEWAY_IMAGE_URL",
        "GATEWAY_FETCH_TIMEOUT_MS",
        "GATEWAY_FETCH_RETRIES",
        "GATEWAY_MAX_IMAGE_BYTES",
        "GATEWAY_READY_POLL_MS",
    ];

    fn clear_vars() {
        for var in VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_vars();
        let config = GatewayConfig::from_env();

        assert_eq!(config.addr, "0.0.0.0:8080");
        assert_eq!(config.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(config.fetch_timeout_ms, 10_000);
        assert_eq!(config.fetch_retries, 3);
        assert_eq!(config.max_image_bytes, 10_485_760);
        assert_eq!(config.ready_poll_ms, 1_000);
    }

    #[test]
    #[serial]
    fn test_overrides_and_fallbacks() {
        clear_vars();
        unsafe {
            std::env::set_var("GATEWAY_ADDR", "127.0.0.1:9000");
            std::env::set_var("GATEWAY_MAX_IMAGE_BYTES", "2048");
            std::env::set_var("GATEWAY_FETCH_RETRIES", "many");
        }

        let config = GatewayConfig::from_env();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.max_image_bytes, 2048);
        assert_eq!(config.fetch_retries, 3, "Unparseable value falls back");

        clear_vars();
    }
}
