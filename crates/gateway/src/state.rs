use crate::fetch::ImageFetcher;
use inference::{DetectionService, InferenceBackend};
use std::sync::Arc;

pub struct AppState<B: InferenceBackend> {
    pub service: Arc<DetectionService<B>>,
    pub fetcher: ImageFetcher,
    pub default_image_url: Arc<str>,
}

impl<B: InferenceBackend> AppState<B> {
    pub fn new(service: DetectionService<B>, fetcher: ImageFetcher, default_image_url: &str) -> Self {
        Self {
            service: Arc::new(service),
            fetcher,
            default_image_url: Arc::from(default_image_url),
        }
    }
}

// Derived Clone would demand `B: Clone`.
impl<B: InferenceBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            fetcher: self.fetcher.clone(),
            default_image_url: Arc::clone(&self.default_image_url),
        }
    }
}
