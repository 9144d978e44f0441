use common::wait_for_resource_async;
use gateway::{
    config::GatewayConfig, fetch::ImageFetcher, logging::init_observability, routes::router,
    state::AppState,
};
use inference::{DetectionService, InferenceBackend, InferenceConfig, TfServingBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env();
    let _telemetry = init_observability(&config)?;
    let inference_config = InferenceConfig::from_env()?;

    let backend = TfServingBackend::from_config(&inference_config)?;
    wait_for_resource_async(|| backend.ready(), config.ready_poll_ms, "Model server").await;

    let state = {
        let _span = common::span!("startup");

        let service = DetectionService::from_config(backend, &inference_config)?;
        tracing::info!(
            threshold = service.postprocessor().confidence_threshold,
            max_boxes = service.postprocessor().max_boxes,
            labels = service.postprocessor().labels().len(),
            "Detection service ready"
        );

        AppState::new(service, ImageFetcher::from_config(&config)?, &config.image_url)
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!(addr = %config.addr, default_image = %config.image_url, "Gateway listening");

    axum::serve(listener, app).await?;

    Ok(())
}
