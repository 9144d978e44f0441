pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod render;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::AppError;
pub use fetch::{FetchError, ImageFetcher};
pub use routes::router;
pub use state::AppState;
