use crate::tensor::{IMAGE_BYTES, KEY, NamedTensor};
use uuid::Uuid;

/// Source of per-request identifiers.
pub trait KeySource: Send + Sync {
    fn next_key(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKeys;

impl KeySource for UuidKeys {
    fn next_key(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// The model inputs for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedInput {
    pub image_bytes: NamedTensor,
    pub key: NamedTensor,
}

impl EncodedInput {
    pub fn request_key(&self) -> Option<&str> {
        self.key.as_scalar_str()
    }

    pub fn into_tensors(self) -> Vec<NamedTensor> {
        vec![self.image_bytes, self.key]
    }
}

/// Builds the `image_bytes` / `key` input pair. The image is passed through
/// untouched; decoding it is the model's job.
#[derive(Debug, Clone, Default)]
pub struct PreProcessor<K = UuidKeys> {
    keys: K,
}

impl PreProcessor {
    pub fn new() -> Self {
        Self { keys: UuidKeys }
    }
}

impl<K: KeySource> PreProcessor<K> {
    pub fn with_key_source(keys: K) -> Self {
        Self { keys }
    }

    pub fn encode(&self, image: Vec<u8>) -> EncodedInput {
        let key = self.keys.next_key();
        tracing::trace!(image_bytes = image.len(), key = %key, "Encoding model input");

        EncodedInput {
            image_bytes: NamedTensor::scalar_bytes(IMAGE_BYTES, image),
            key: NamedTensor::scalar_string(KEY, &key),
        }
    }
}
