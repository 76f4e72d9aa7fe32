pub mod groq;
pub mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use crate::errors::AppError;

pub const SYSTEM_PROMPT: &str = "You are the help desk assistant for a bike service centre. \
     The centre offers General Service, Oil Change, Water Wash and Brake Service. \
     Answer questions about bookings, service types and bike maintenance briefly. \
     If the customer sends a photo, describe any visible problem and suggest a service.";

/// Sent when the assistant is unreachable or too slow.
pub const FALLBACK_REPLY: &str = "I'm having trouble connecting right now. \
     Please try again or call the service desk for immediate assistance.";

/// Sent when the assistant answers with nothing.
pub const EMPTY_REPLY: &str = "I'm here to help with your bike service needs!";

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Result<Self, AppError> {
        let content_type = content_type.into();
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "attachment must be an image, got {content_type}"
            )));
        }
        if bytes.is_empty() {
            return Err(AppError::Validation("image attachment is empty".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation("image must be smaller than 5MB".to_string()));
        }
        Ok(Self {
            content_type,
            bytes,
        })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.to_base64())
    }
}

#[async_trait]
pub trait Assistant: Send + Sync {
    async fn reply(&self, text: &str, image: Option<&ImageAttachment>) -> anyhow::Result<String>;
}

/// Forwards a question to the assistant, bounded by `timeout`.
pub async fn relay(
    assistant: &dyn Assistant,
    text: &str,
    image: Option<&ImageAttachment>,
    timeout: Duration,
) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() && image.is_none() {
        return Err(AppError::Validation("send a message or an image".to_string()));
    }

    match tokio::time::timeout(timeout, assistant.reply(text, image)).await {
        Ok(Ok(answer)) if answer.trim().is_empty() => Ok(EMPTY_REPLY.to_string()),
        Ok(Ok(answer)) => Ok(answer.trim().to_string()),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "assistant request failed");
            Err(AppError::UpstreamUnavailable(format!("assistant error: {e}")))
        }
        Err(_) => {
            tracing::warn!(timeout_secs = timeout.as_secs_f64(), "assistant timed out");
            Err(AppError::UpstreamUnavailable("assistant timed out".to_string()))
        }
    }
}
