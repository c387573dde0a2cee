//! Gemini generateContent client
//!
//! One non-streaming request per generation: the system instruction goes in
//! `systemInstruction`, the user message is the single `user` content, and the
//! fixed decoding parameters ride in `generationConfig`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GeneratedPrompt, GenerationError, GenerationProvider, TEMPERATURE, TOP_K, TOP_P};
use crate::config::ForgeConfig;
use crate::prompt::RenderedPrompt;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> reqwest::Result<Self> {
        Self::with_options(api_key, GEMINI_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_options(
        api_key: Option<String>,
        base_url: &str,
        model: &str,
        timeout_secs: u64,
    ) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &ForgeConfig) -> reqwest::Result<Self> {
        Self::with_options(
            config.gemini_api_key.clone(),
            &config.gemini_base_url,
            &config.gemini_model,
            config.gemini_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiSystemInstruction,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiError,
}

fn build_request(prompt: &RenderedPrompt) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiTextPart {
                text: prompt.user_message.clone(),
            }],
        }],
        system_instruction: GeminiSystemInstruction {
            parts: vec![GeminiTextPart {
                text: prompt.system_instruction.clone(),
            }],
        },
        generation_config: GeminiGenerationConfig {
            temperature: TEMPERATURE,
            top_k: TOP_K,
            top_p: TOP_P,
        },
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GeminiResponse) -> Result<String, GenerationError> {
    if let Some(error) = response.error {
        return Err(GenerationError::Api {
            status: 200,
            message: error.message,
        });
    }

    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate(&self, prompt: &RenderedPrompt) -> Result<GeneratedPrompt, GenerationError> {
        let api_key = self.api_key.as_ref().ok_or(GenerationError::MissingApiKey)?;

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key.as_str())])
            .json(&build_request(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GenerationError::Api { status, message });
        }

        let body = response.text().await?;
        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let text = extract_text(parsed)?;
        tracing::info!(model = %self.model, chars = text.len(), "Gemini generation complete");

        Ok(GeneratedPrompt {
            text,
            model: self.model.clone(),
        })
    }
}
