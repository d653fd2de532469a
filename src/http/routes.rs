use crate::adapters::uploads::{StoredFile, UploadStore};
use crate::core::orchestrator::SendOrchestrator;
use crate::domain::model::{Payload, Recipient, SessionState};
use crate::domain::ports::Transport;
use crate::http::response::{group_outcome_response, outcome_response, ApiError};
use crate::utils::error::UploadError;
use axum::extract::multipart::{Field, Multipart};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

/// Room left in the request body limit for the non-file form fields.
const FORM_OVERHEAD: usize = 1024 * 1024;

pub struct AppState<T: Transport> {
    pub orchestrator: SendOrchestrator<T>,
    pub uploads: Arc<UploadStore>,
    pub session: watch::Receiver<SessionState>,
}

impl<T: Transport> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            uploads: Arc::clone(&self.uploads),
            session: self.session.clone(),
        }
    }
}

impl<T: Transport> AppState<T> {
    pub fn new(
        transport: Arc<T>,
        uploads: UploadStore,
        session: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            orchestrator: SendOrchestrator::new(transport),
            uploads: Arc::new(uploads),
            session,
        }
    }

    fn ensure_ready(&self) -> Result<(), ApiError> {
        let state = *self.session.borrow();
        if state == SessionState::Ready {
            Ok(())
        } else {
            Err(ApiError::unavailable(format!(
                "WhatsApp session is not ready ({})",
                state.as_str()
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub number: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendGroupRequest {
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub fn router<T: Transport + 'static>(state: AppState<T>) -> Router {
    let body_limit = state.uploads.max_file_size() + FORM_OVERHEAD;

    let messages = Router::new()
        .route("/send", post(send_text::<T>))
        .route("/send-media", post(send_media::<T>))
        .route("/send-group", post(send_group::<T>));

    Router::new()
        .nest("/api/messages", messages)
        .route("/api/health", get(health::<T>))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    value.ok_or_else(|| ApiError::bad_request(format!("Missing required field: {}", field)))
}

fn json_body<B>(payload: Result<Json<B>, JsonRejection>) -> Result<B, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

async fn send_text<T: Transport + 'static>(
    State(state): State<AppState<T>>,
    payload: Result<Json<SendTextRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    state.ensure_ready()?;
    let body = json_body(payload)?;
    let number = required("number", body.number)?;
    let message = required("message", body.message)?;

    let outcome = state
        .orchestrator
        .send(&Recipient::Contact(number.clone()), Payload::Text(message))
        .await;

    Ok(outcome_response(outcome, &number, "Message sent"))
}

async fn send_group<T: Transport + 'static>(
    State(state): State<AppState<T>>,
    payload: Result<Json<SendGroupRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    state.ensure_ready()?;
    let body = json_body(payload)?;
    let group_id = required("groupId", body.group_id)?;
    let message = required("message", body.message)?;

    let outcome = state
        .orchestrator
        .send(&Recipient::Group(group_id.clone()), Payload::Text(message))
        .await;

    Ok(group_outcome_response(outcome, &group_id))
}

async fn send_media<T: Transport + 'static>(
    State(state): State<AppState<T>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    state.ensure_ready()?;

    let mut stored: Option<StoredFile> = None;
    let form = read_media_form(&state.uploads, multipart, &mut stored).await;

    // 請求被拒時不留下已存的檔案
    let (number, caption, file) = match form {
        Ok(form) => form,
        Err(e) => {
            if let Some(file) = stored.take() {
                file.remove().await;
            }
            return Err(e);
        }
    };
    tracing::debug!(
        "Stored upload {} ({} bytes) at {}",
        file.original_name,
        file.size,
        file.path.display()
    );

    let payload = Payload::Media {
        file_path: file.path,
        mime_type: file.mime_type,
        caption,
    };
    let outcome = state
        .orchestrator
        .send(&Recipient::Contact(number.clone()), payload)
        .await;

    Ok(outcome_response(outcome, &number, "Media message sent"))
}

/// Reads the `number`, `caption` and single `file` parts. A file stored before an
/// error is left in `stored` for the caller to remove.
async fn read_media_form(
    uploads: &UploadStore,
    mut multipart: Multipart,
    stored: &mut Option<StoredFile>,
) -> Result<(String, Option<String>, StoredFile), ApiError> {
    let mut number = None;
    let mut caption = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if stored.is_some() {
                    return Err(ApiError::bad_request("Only one file may be uploaded"));
                }
                *stored = Some(store_file(uploads, field).await?);
            }
            "number" => number = Some(field_text(field).await?),
            "caption" => caption = Some(field_text(field).await?),
            _ => {}
        }
    }

    if stored.is_none() {
        return Err(UploadError::MissingFile.into());
    }
    let number = required("number", number)?;
    let file = stored.take().ok_or(UploadError::MissingFile)?;
    Ok((number, caption, file))
}

async fn health<T: Transport + 'static>(State(state): State<AppState<T>>) -> impl IntoResponse {
    let session = *state.session.borrow();
    Json(HealthResponse {
        status: "ok",
        session: session.as_str(),
        timestamp: chrono::Utc::now(),
    })
}

async fn next_field<'a>(multipart: &'a mut Multipart) -> Result<Option<Field<'a>>, ApiError> {
    multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()).into())
}

async fn field_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()).into())
}

/// Streams the `file` field to disk, rejecting bad types and oversize uploads.
async fn store_file(uploads: &UploadStore, mut field: Field<'_>) -> Result<StoredFile, ApiError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut writer = uploads.create(&original_name, &mime_type).await.map_err(|e| {
        tracing::warn!("Rejected upload {}: {}", original_name, e);
        ApiError::from(e)
    })?;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                writer.discard().await;
                return Err(UploadError::Multipart(e.to_string()).into());
            }
        };

        if let Err(e) = writer.write_chunk(&chunk).await {
            tracing::warn!("Rejected upload {}: {}", original_name, e);
            writer.discard().await;
            return Err(e.into());
        }
    }

    Ok(writer.finish().await?)
}
