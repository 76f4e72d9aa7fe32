use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{Assistant, ImageAttachment, SYSTEM_PROMPT};

/// OpenAI-compatible chat completions on Groq. Images travel as data URLs, so
/// the configured model must accept vision input when customers attach photos.
pub struct GroqAssistant {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GroqAssistant {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Assistant for GroqAssistant {
    async fn reply(&self, text: &str, image: Option<&ImageAttachment>) -> anyhow::Result<String> {
        let user_content = match image {
            Some(image) => json!([
                { "type": "text", "text": text },
                { "type": "image_url", "image_url": { "url": image.to_data_url() } },
            ]),
            None => json!(text),
        };

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_content },
            ],
            "temperature": 0.4,
        });

        let resp = self
            .client
            .post("https://api.groq.com/openai/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call Groq API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse Groq response")?;

        if !status.is_success() {
            anyhow::bail!("Groq API error ({}): {}", status, data);
        }

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing content in Groq response"))
    }
}
