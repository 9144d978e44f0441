pub mod config;
pub mod logging;
#[cfg(feature = "async")]
pub mod retry;
pub mod telemetry;
#[cfg(feature = "async")]
pub mod wait;

pub use config::{Environment, env_or, env_parse};
pub use logging::setup_logging;
#[cfg(feature = "async")]
pub use retry::retry_with_backoff_async;
pub use telemetry::TelemetryGuard;
#[cfg(feature = "async")]
pub use wait::wait_for_resource_async;
