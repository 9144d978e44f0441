use crate::tensor::NamedTensor;
use std::future::Future;

pub mod tfserving;

/// A model that maps named input tensors to named output tensors.
///
/// Output order is unspecified and extra outputs may be present.
pub trait InferenceBackend: Send + Sync {
    fn infer(
        &self,
        inputs: Vec<NamedTensor>,
    ) -> impl Future<Output = anyhow::Result<Vec<NamedTensor>>> + Send;

    /// Resolves once the model can serve requests.
    fn ready(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}
