use crate::event_log::EventSource;
use crate::{
    prompts, ApiError, AppState, ChatReply, ChatRequest, HealthReply, PestAnswer,
    TranscriptionReply,
};

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::Json;
use image::ImageFormat;
use provider_client::{AudioClip, ChatCompletion, ImagePayload, VisionRequest};
use tracing::instrument;

const DEFAULT_AUDIO_NAME: &str = "recording.webm";

pub(crate) async fn health() -> Json<HealthReply> {
    Json(HealthReply {
        status: "ok".to_string(),
    })
}

/// The body is read as JSON regardless of its declared content type.
#[instrument(skip_all, fields(message_len, reply_len))]
pub(crate) async fn chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let span = tracing::Span::current();

    let request: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Rejecting malformed chat body: {:?}", e);
        ApiError::InvalidMessage
    })?;
    let message = request.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        return Err(ApiError::InvalidMessage);
    }
    span.record("message_len", message.len());

    let completion = ChatCompletion {
        system: prompts::chat_system_prompt(request.language.as_deref()),
        user: message.to_string(),
    };

    let result = {
        let _permit = state.provider_permits.acquire().await.map_err(|e| {
            tracing::error!("Provider permits closed: {:?}", e);
            ApiError::ChatFailed
        })?;
        state.chat.complete(&completion).await
    };

    match result {
        Ok(reply) => {
            span.record("reply_len", reply.len());
            state
                .events
                .record(EventSource::Chat, message, "Response OK")
                .await;
            tracing::info!("SUCCESS");
            Ok(Json(ChatReply { reply }))
        }
        Err(e) => {
            tracing::error!("Chat error: {:?}", e);
            state
                .events
                .record(EventSource::Chat, &e.to_string(), "Chat generation failed")
                .await;
            Err(ApiError::ChatFailed)
        }
    }
}

#[instrument(skip_all, fields(file_name, bytes, text_len))]
pub(crate) async fn transcribe(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionReply>, ApiError> {
    let span = tracing::Span::current();

    let form = read_form(multipart).await?;
    let upload = form.file.ok_or(ApiError::NoFileUploaded)?;
    let file_name = upload
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AUDIO_NAME.to_string());
    span.record("file_name", file_name.as_str());
    span.record("bytes", upload.bytes.len());

    let clip = AudioClip {
        bytes: upload.bytes,
        file_name: file_name.clone(),
        language: form.language,
    };

    let result = {
        let _permit = state.provider_permits.acquire().await.map_err(|e| {
            tracing::error!("Provider permits closed: {:?}", e);
            ApiError::TranscriptionFailed
        })?;
        state.transcriber.transcribe(clip).await
    };

    match result {
        Ok(text) => {
            let text = text.trim().to_string();
            span.record("text_len", text.len());
            state
                .events
                .record(EventSource::Transcribe, &file_name, "Transcription OK")
                .await;
            tracing::info!("SUCCESS");
            Ok(Json(TranscriptionReply { text }))
        }
        Err(e) => {
            tracing::error!("Transcription error: {:?}", e);
            state
                .events
                .record(EventSource::Transcribe, &file_name, &format!("Error: {e}"))
                .await;
            Err(ApiError::TranscriptionFailed)
        }
    }
}

#[instrument(skip_all, fields(file_name, bytes, parsed))]
pub(crate) async fn detect_pest(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PestAnswer>, ApiError> {
    let span = tracing::Span::current();

    let form = read_form(multipart).await?;
    let upload = form.file.ok_or(ApiError::NoFileUploaded)?;
    let file_name = upload
        .file_name
        .filter(|name| !name.trim().is_empty())
        .ok_or(ApiError::NoFileSelected)?;
    span.record("file_name", file_name.as_str());
    span.record("bytes", upload.bytes.len());

    let format = verify_image(&upload.bytes).map_err(|e| {
        tracing::warn!("Rejecting upload {}: {:?}", file_name, e);
        ApiError::InvalidImage
    })?;

    match analyse_image(&state, &file_name, upload.bytes, format).await {
        Ok(answer) => {
            span.record("parsed", answer.is_model());
            let status = if answer.is_model() {
                "Detection OK"
            } else {
                "JSON parse fallback"
            };
            state.events.record(EventSource::Pest, &file_name, status).await;
            tracing::info!("SUCCESS");
            Ok(Json(answer))
        }
        Err(e) => {
            tracing::error!("Pest detection error: {:?}", e);
            state
                .events
                .record(EventSource::Pest, &file_name, &format!("Error: {e}"))
                .await;
            Err(ApiError::PestDetectionFailed)
        }
    }
}

/// Saves the image, asks the vision model about it and wraps the answer.
async fn analyse_image(
    state: &AppState,
    file_name: &str,
    bytes: Vec<u8>,
    format: ImageFormat,
) -> Result<PestAnswer> {
    state
        .uploads
        .save(file_name, &bytes)
        .await
        .context("saving upload")?;

    let request = VisionRequest {
        prompt: prompts::PEST_PROMPT.to_string(),
        image: ImagePayload {
            bytes,
            mime_type: format.to_mime_type().to_string(),
        },
    };

    let text = {
        let _permit = state.provider_permits.acquire().await?;
        state.vision.describe_image(&request).await?
    };

    Ok(PestAnswer::from_model_text(&text))
}

fn verify_image(bytes: &[u8]) -> Result<ImageFormat> {
    let format = image::guess_format(bytes)?;
    image::load_from_memory_with_format(bytes, format)?;
    Ok(format)
}

struct Upload {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<Upload>,
    language: Option<String>,
}

/// A body that is not multipart, or breaks off halfway, counts as "no file".
async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("Not a multipart upload: {:?}", e);
        ApiError::NoFileUploaded
    })?;
    collect_fields(&mut multipart).await.map_err(|e| {
        tracing::warn!("Malformed multipart upload: {:?}", e);
        ApiError::NoFileUploaded
    })
}

async fn collect_fields(multipart: &mut Multipart) -> Result<UploadForm, MultipartError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") if form.file.is_none() => {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await?.to_vec();
                form.file = Some(Upload { file_name, bytes });
            }
            Some("language") => {
                let language = field.text().await?;
                let language = language.trim();
                if !language.is_empty() {
                    form.language = Some(language.to_string());
                }
            }
            _ => {}
        }
    }
    Ok(form)
}
