use inference::{
    ClassLabelTable, DecodeError, DetectError, DetectionService, InferenceBackend, KeySource,
    NamedTensor, PostProcessor, PreProcessor,
};
use std::sync::{Arc, Mutex};

/// Backend that records its inputs and answers with fixed outputs.
struct CannedBackend {
    outputs: Result<Vec<NamedTensor>, String>,
    seen: Mutex<Vec<Vec<NamedTensor>>>,
}

impl CannedBackend {
    fn answering(outputs: Vec<NamedTensor>) -> Self {
        Self {
            outputs: Ok(outputs),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            outputs: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl InferenceBackend for CannedBackend {
    async fn infer(&self, inputs: Vec<NamedTensor>) -> anyhow::Result<Vec<NamedTensor>> {
        self.seen.lock().unwrap().push(inputs);
        match &self.outputs {
            Ok(outputs) => Ok(outputs.clone()),
            Err(message) => Err(anyhow::anyhow!("{message}")),
        }
    }

    async fn ready(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct FixedKey;

impl KeySource for FixedKey {
    fn next_key(&self) -> String {
        "fixed-key".to_string()
    }
}

fn model_outputs(class_ids: &[f32], scores: &[f32], boxes: &[[f32; 4]]) -> Vec<NamedTensor> {
    let n = class_ids.len();
    vec![
        NamedTensor::float(
            "detection_boxes",
            &[1, n, 4],
            boxes.iter().flatten().copied().collect(),
        )
        .unwrap(),
        NamedTensor::float("detection_classes", &[1, n], class_ids.to_vec()).unwrap(),
        NamedTensor::float("detection_scores", &[1, n], scores.to_vec()).unwrap(),
        NamedTensor::scalar_string("key", "fixed-key"),
    ]
}

fn postprocessor() -> PostProcessor {
    PostProcessor::new(0.7, 40, Arc::new(ClassLabelTable::default()))
}

/// Scenario: classIds [1, 2, -1], scores [0.95, 0.5, 0.99] → one "box".
#[tokio::test]
async fn test_detect_end_to_end() {
    let backend = CannedBackend::answering(model_outputs(
        &[1.0, 2.0, -1.0],
        &[0.95, 0.5, 0.99],
        &[[0.1, 0.2, 0.5, 0.6], [0.0, 0.0, 1.0, 1.0], [0.2, 0.2, 0.3, 0.3]],
    ));
    let service = DetectionService::with_preprocessor(
        backend,
        PreProcessor::with_key_source(FixedKey),
        postprocessor(),
    );

    let image = b"\xff\xd8\xff\xe0not-really-a-jpeg".to_vec();
    let detections = service.detect(image.clone()).await.unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "box");
    assert!((detections[0].rect.x - 0.2).abs() < 1e-6);
    assert!((detections[0].rect.height - 0.4).abs() < 1e-6);

    let seen = service.backend().seen.lock().unwrap();
    assert_eq!(seen.len(), 1, "Backend should be called once per request");
    let inputs = &seen[0];
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0].name(), "image_bytes");
    assert_eq!(inputs[0].as_scalar_bytes(), Some(image.as_slice()));
    assert_eq!(inputs[1].name(), "key");
    assert_eq!(inputs[1].as_scalar_str(), Some("fixed-key"));
}

#[tokio::test]
async fn test_each_request_gets_a_fresh_key() {
    let backend = CannedBackend::answering(model_outputs(&[], &[], &[]));
    let service = DetectionService::new(backend, postprocessor());

    service.detect(vec![1, 2, 3]).await.unwrap();
    service.detect(vec![1, 2, 3]).await.unwrap();

    let seen = service.backend().seen.lock().unwrap();
    let first_key = seen[0][1].as_scalar_str().unwrap();
    let second_key = seen[1][1].as_scalar_str().unwrap();
    assert_ne!(first_key, second_key);
    assert_eq!(seen[0][0], seen[1][0], "Image payloads must match");
}

#[tokio::test]
async fn test_missing_output_is_a_decode_error() {
    let outputs = model_outputs(&[1.0], &[0.9], &[[0.0, 0.0, 1.0, 1.0]])
        .into_iter()
        .filter(|t| t.name() != "detection_scores")
        .collect();
    let service = DetectionService::new(CannedBackend::answering(outputs), postprocessor());

    let err = service.detect(vec![0u8; 16]).await.unwrap_err();
    assert!(
        matches!(
            err,
            DetectError::Decode(DecodeError::MissingTensor {
                name: "detection_scores"
            })
        ),
        "Unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_backend_failure_is_reported() {
    let service = DetectionService::new(CannedBackend::failing("model not loaded"), postprocessor());

    let err = service.detect(vec![0u8; 16]).await.unwrap_err();
    match err {
        DetectError::Backend(e) => assert!(e.to_string().contains("model not loaded")),
        other => panic!("Expected backend error, got {other}"),
    }
}

#[tokio::test]
async fn test_service_is_shareable_across_tasks() {
    let backend = CannedBackend::answering(model_outputs(&[2.0], &[0.8], &[[0.0, 0.0, 0.5, 0.5]]));
    let service = Arc::new(DetectionService::new(backend, postprocessor()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.detect(vec![i; 4]).await })
        })
        .collect();

    for handle in handles {
        let detections = handle.await.unwrap().unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "box_clear");
    }
    assert_eq!(service.backend().seen.lock().unwrap().len(), 8);
}
