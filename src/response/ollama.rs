use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::mood::EmotionKind;

use super::{ResponseGenerator, ResponseRequest};

const AVAILABILITY_TIMEOUT_SECS: u64 = 2;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Talks to a local Ollama server over its HTTP API.
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Installed model names; errors when the server cannot be reached.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(AVAILABILITY_TIMEOUT_SECS))
            .send()
            .await
            .with_context(|| format!("failed to reach Ollama at {}", self.base_url))?;

        if !response.status().is_success() {
            bail!("Ollama tags request failed with status {}", response.status());
        }

        let tags: TagsResponse = response.json().await.context("invalid tags response")?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn is_available(&self) -> bool {
        self.list_models().await.is_ok()
    }
}

fn describe(emotion: Option<EmotionKind>) -> &'static str {
    match emotion {
        Some(EmotionKind::Happy) => "happy",
        Some(EmotionKind::Sad) => "sad",
        Some(EmotionKind::Angry) => "angry",
        Some(EmotionKind::Fear) => "anxious",
        Some(EmotionKind::Surprise) => "surprised",
        Some(EmotionKind::Disgust) => "disgusted",
        Some(EmotionKind::Neutral) | None => "neutral and calm",
    }
}

pub fn build_prompt(request: &ResponseRequest) -> String {
    let context = format!(
        "You are an empathetic and caring assistant.\n\
         The user seems {} (mood: {}).\n\
         Write a short reply (2-3 sentences at most) that:\n\
         - is empathetic and suited to their emotional state\n\
         - encourages or comforts them depending on their mood\n\
         - stays natural and human",
        describe(request.emotion),
        request.mood,
    );

    match request.user_message.as_deref().map(str::trim) {
        Some(message) if !message.is_empty() => {
            format!("{context}\n\nUser message: \"{message}\"\n\nReply with empathy:")
        }
        _ => format!("{context}\n\nWrite an empathetic opening line:"),
    }
}

#[async_trait]
impl ResponseGenerator for OllamaGenerator {
    async fn generate(&self, request: &ResponseRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(request),
            stream: false,
            options: GenerateOptions {
                temperature: 0.7,
                top_p: 0.9,
                num_predict: 150,
            },
        };

        debug!("Sending generate request to {} (model {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Ollama generate request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            bail!("Ollama generate failed ({status}): {error}");
        }

        let result: GenerateResponse = response
            .json()
            .await
            .context("invalid generate response")?;

        let text = result.response.trim();
        if text.is_empty() {
            return Err(anyhow!("Ollama returned an empty response"));
        }

        Ok(text.to_string())
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
