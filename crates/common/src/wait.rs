use std::future::Future;
use std::time::Duration;

/// Poll `probe` until it succeeds, sleeping `poll_interval_ms` between
/// attempts. Never gives up.
pub async fn wait_for_resource_async<F, Fut, T, E>(
    mut probe: F,
    poll_interval_ms: u64,
    resource_name: &str,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    loop {
        match probe().await {
            Ok(resource) => {
                tracing::info!("{} ready", resource_name);
                return resource;
            }
            Err(e) => {
                tracing::debug!("Waiting for {} ({})", resource_name, e);
                tokio::time::sleep(Duration::from_millis(poll_interval_ms)).await;
            }
        }
    }
}
