//! Reply generation for the chat companion.
//!
//! `StaticResponses` answers from canned tables, `OllamaGenerator` delegates to a local LLM
//! server, and `FallbackGenerator` chains the two so callers only ever see a string.

pub mod fallback;
pub mod ollama;
pub mod table;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::mood::{EmotionKind, MoodState};
use crate::settings::GeneratorSettings;

pub use fallback::FallbackGenerator;
pub use ollama::OllamaGenerator;
pub use table::StaticResponses;

/// What the companion knows when it has to say something.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRequest {
    pub mood: MoodState,
    pub emotion: Option<EmotionKind>,
    pub user_message: Option<String>,
    pub include_tip: bool,
}

impl ResponseRequest {
    pub fn greeting(mood: MoodState, emotion: Option<EmotionKind>) -> Self {
        Self {
            mood,
            emotion,
            user_message: None,
            include_tip: false,
        }
    }
}

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, request: &ResponseRequest) -> Result<String>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Pick the generator stack once, from settings.
///
/// The Ollama server is asked for its models up front; when it does not answer, the whole
/// session uses canned replies instead of timing out on every message.
pub async fn build_generator(settings: &GeneratorSettings) -> Arc<dyn ResponseGenerator> {
    let table = match settings.seed {
        Some(seed) => StaticResponses::with_seed(seed),
        None => StaticResponses::new(),
    };

    if !settings.use_ollama {
        return Arc::new(table);
    }

    let remote =
        match OllamaGenerator::new(&settings.ollama_url, &settings.ollama_model, settings.timeout_secs) {
            Ok(remote) => remote,
            Err(err) => {
                warn!("Ollama client unavailable, using canned replies only: {err:#}");
                return Arc::new(table);
            }
        };

    if !remote.is_available().await {
        warn!(
            "Ollama not reachable at {}, using canned replies only",
            settings.ollama_url
        );
        return Arc::new(table);
    }

    Arc::new(FallbackGenerator::new(remote, table))
}
