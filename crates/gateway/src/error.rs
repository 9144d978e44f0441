use crate::fetch::FetchError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inference::DetectError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("request body is empty")]
    EmptyBody,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("failed to render detections: {0}")]
    Render(#[from] serde_json::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::EmptyBody => StatusCode::BAD_REQUEST,
            AppError::Fetch(FetchError::InvalidUrl { .. }) => StatusCode::BAD_REQUEST,
            AppError::Fetch(FetchError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
            AppError::Detect(DetectError::Backend(_)) => StatusCode::BAD_GATEWAY,
            AppError::Detect(DetectError::Decode(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The error text collapsed to one line; upstream messages may span several.
    pub fn message(&self) -> String {
        self.to_string()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Detection request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "Detection request rejected");
        }

        (status, format!("{message}\n")).into_response()
    }
}
