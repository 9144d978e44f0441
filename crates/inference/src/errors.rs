use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn raw model outputs into detections. Always fatal for the
/// request: no partial list is produced.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("required output tensor `{name}` is missing")]
    MissingTensor { name: &'static str },

    #[error("output tensor `{name}` is malformed: {reason}")]
    MalformedTensor { name: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("failed to read class labels from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid class label entry `{entry}`: {reason}")]
    InvalidEntry { entry: String, reason: &'static str },

    #[error("class id {id} is listed more than once")]
    DuplicateId { id: i64 },
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("inference backend failed: {0:#}")]
    Backend(anyhow::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
