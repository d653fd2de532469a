use crate::domain::model::{RejectionReason, SendOutcome};
use crate::utils::error::UploadError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error reply in the `{status: "Error", message}` shape.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal Server Error".to_string(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse {
            status: "Error".to_string(),
            message: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<UploadError> for ApiError {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::Io(e) => {
                tracing::error!("Failed to store upload: {}", e);
                ApiError::internal()
            }
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

pub fn success(message: &str) -> Response {
    let body = ApiResponse {
        status: message.to_string(),
        message: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn rejection_message(reason: RejectionReason, raw: &str) -> String {
    match reason {
        RejectionReason::UnregisteredNumber => format!(
            "Number {} is not registered on WhatsApp. Please update the phone number.",
            raw
        ),
        RejectionReason::ContainsNonDigits => {
            "Phone number contains letters instead of digits. Please update the phone number."
                .to_string()
        }
        RejectionReason::InvalidGroupId => {
            "Invalid group id. The expected format is [groupid@g.us].".to_string()
        }
        RejectionReason::InvalidAddressToken => {
            "Phone number contains non-digit characters. Please update the phone number."
                .to_string()
        }
    }
}

/// Maps a send outcome to its HTTP reply.
pub fn outcome_response(outcome: SendOutcome, raw: &str, success_message: &str) -> Response {
    match outcome {
        SendOutcome::Sent => success(success_message),
        SendOutcome::Rejected(reason) => {
            ApiError::bad_request(rejection_message(reason, raw)).into_response()
        }
        SendOutcome::TransportFailure => ApiError::internal().into_response(),
    }
}

/// Group sends have no phone-number hint: an `invalid wid` from the engine is a server error.
pub fn group_outcome_response(outcome: SendOutcome, group_id: &str) -> Response {
    match outcome {
        SendOutcome::Rejected(RejectionReason::InvalidAddressToken) => {
            tracing::error!("Engine rejected group id {} as invalid wid", group_id);
            ApiError::internal().into_response()
        }
        other => outcome_response(other, group_id, "Message sent to group"),
    }
}
