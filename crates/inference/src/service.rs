use crate::{
    backend::InferenceBackend,
    config::InferenceConfig,
    detection::Detection,
    errors::DetectError,
    processing::{
        post::PostProcessor,
        pre::{KeySource, PreProcessor, UuidKeys},
    },
};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::time::Instant;

/// Encode → infer → decode for one image at a time. Shareable across tasks;
/// holds no per-request state.
pub struct DetectionService<B: InferenceBackend, K: KeySource = UuidKeys> {
    backend: B,
    preprocessor: PreProcessor<K>,
    postprocessor: PostProcessor,
    metrics: DetectMetrics,
}

struct DetectMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    failures: Counter<u64>,
    detections: Counter<u64>,
}

fn init_metrics(meter: &Meter) -> DetectMetrics {
    let latency_buckets = [
        0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
    ];
    DetectMetrics {
        duration: meter
            .f64_histogram("detect_duration_seconds")
            .with_description("Time to run one image through encode, inference and decode, by outcome")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build(),
        requests: meter
            .u64_counter("detect_requests_total")
            .with_description("Total detection requests")
            .build(),
        failures: meter
            .u64_counter("detect_failures_total")
            .with_description("Detection requests that failed, by stage")
            .build(),
        detections: meter
            .u64_counter("detections_total")
            .with_description("Total detections returned")
            .build(),
    }
}

impl<B: InferenceBackend> DetectionService<B> {
    pub fn new(backend: B, postprocessor: PostProcessor) -> Self {
        Self::with_preprocessor(backend, PreProcessor::new(), postprocessor)
    }

    pub fn from_config(backend: B, config: &InferenceConfig) -> anyhow::Result<Self> {
        let postprocessor = PostProcessor::from_config(config)?;
        Ok(Self::new(backend, postprocessor))
    }
}

impl<B: InferenceBackend, K: KeySource> DetectionService<B, K> {
    pub fn with_preprocessor(
        backend: B,
        preprocessor: PreProcessor<K>,
        postprocessor: PostProcessor,
    ) -> Self {
        Self {
            backend,
            preprocessor,
            postprocessor,
            metrics: init_metrics(&global::meter("inference")),
        }
    }

    /// Record metrics on `meter` instead of the global `inference` meter.
    pub fn with_meter(mut self, meter: &Meter) -> Self {
        self.metrics = init_metrics(meter);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn postprocessor(&self) -> &PostProcessor {
        &self.postprocessor
    }

    #[tracing::instrument(skip_all, fields(image_bytes = image.len(), key = tracing::field::Empty))]
    pub async fn detect(&self, image: Vec<u8>) -> Result<Vec<Detection>, DetectError> {
        let start = Instant::now();
        self.metrics.requests.add(1, &[]);

        let result = self.run(image).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(detections) => {
                self.metrics
                    .duration
                    .record(elapsed.as_secs_f64(), &[KeyValue::new("outcome", "ok")]);
                self.metrics.detections.add(detections.len() as u64, &[]);
                tracing::info!(
                    detections = detections.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Detection complete"
                );
            }
            Err(e) => {
                self.metrics
                    .duration
                    .record(elapsed.as_secs_f64(), &[KeyValue::new("outcome", "error")]);
                self.metrics
                    .failures
                    .add(1, &[KeyValue::new("stage", failure_stage(e))]);
                tracing::warn!(
                    error = %e,
                    stage = failure_stage(e),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Detection failed"
                );
            }
        }

        result
    }

    async fn run(&self, image: Vec<u8>) -> Result<Vec<Detection>, DetectError> {
        let encoded = self.preprocessor.encode(image);
        if let Some(key) = encoded.request_key() {
            tracing::Span::current().record("key", key);
        }

        let outputs = self
            .backend
            .infer(encoded.into_tensors())
            .await
            .map_err(DetectError::Backend)?;

        Ok(self.postprocessor.decode(outputs)?)
    }
}

fn failure_stage(error: &DetectError) -> &'static str {
    match error {
        DetectError::Backend(_) => "inference",
        DetectError::Decode(_) => "decode",
    }
}
