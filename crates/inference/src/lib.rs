pub mod backend;
pub mod config;
pub mod detection;
pub mod errors;
pub mod labels;
pub mod processing;
pub mod service;
pub mod tensor;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, tfserving::TfServingBackend};
pub use config::InferenceConfig;
pub use detection::{Detection, Rectangle};
pub use errors::{DecodeError, DetectError, LabelError};
pub use labels::ClassLabelTable;
pub use processing::{
    post::PostProcessor,
    pre::{EncodedInput, KeySource, PreProcessor, UuidKeys},
};
pub use service::DetectionService;
pub use tensor::{NamedTensor, TensorData};
