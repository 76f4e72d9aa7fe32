use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{Assistant, ImageAttachment, SYSTEM_PROMPT};

pub struct OllamaAssistant {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaAssistant {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Assistant for OllamaAssistant {
    async fn reply(&self, text: &str, image: Option<&ImageAttachment>) -> anyhow::Result<String> {
        let mut user_message = json!({
            "role": "user",
            "content": text,
        });
        if let Some(image) = image {
            user_message["images"] = json!([image.to_base64()]);
        }

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                user_message,
            ],
            "stream": false,
        });

        let data: serde_json::Value = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .context("failed to call Ollama API")?
            .error_for_status()
            .context("Ollama API returned error")?
            .json()
            .await
            .context("failed to parse Ollama response")?;

        data["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing content in Ollama response"))
    }
}
