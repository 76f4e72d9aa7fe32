use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::services::assistant::{self, ImageAttachment, FALLBACK_REPLY};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub degraded: bool,
}

// POST /api/chat (multipart: `text`, optional `image`)
pub async fn chat(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, AppError> {
    let mut text = String::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed upload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => {
                text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("unreadable text: {e}")))?;
            }
            Some("image") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("unreadable image: {e}")))?;
                image = Some(ImageAttachment::new(content_type, bytes.to_vec())?);
            }
            _ => {}
        }
    }

    let result = assistant::relay(
        state.assistant.as_ref(),
        &text,
        image.as_ref(),
        state.config.assistant_timeout(),
    )
    .await;

    match result {
        Ok(answer) => Ok(Json(ChatResponse {
            answer,
            degraded: false,
        })),
        Err(AppError::UpstreamUnavailable(reason)) => {
            tracing::warn!(%reason, "serving fallback chat reply");
            Ok(Json(ChatResponse {
                answer: FALLBACK_REPLY.to_string(),
                degraded: true,
            }))
        }
        Err(e) => Err(e),
    }
}
