//! Generation providers
//!
//! The formatter's rendered prompt goes out through a `GenerationProvider`.
//! Success and failure are distinct: callers get a `GeneratedPrompt` or a
//! `GenerationError`, never an error message dressed up as model output.

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::prompt::{render, RenderedPrompt};
use crate::types::PromptRequest;

/// Fixed decoding parameters sent with every generation
pub const TEMPERATURE: f32 = 0.7;
pub const TOP_K: u32 = 40;
pub const TOP_P: f32 = 0.95;

/// Raw model text plus the model that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPrompt {
    pub text: String,
    pub model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("model returned no text")]
    EmptyResponse,
}

impl GenerationError {
    /// Text shown in place of a result when generation fails
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::EmptyResponse => {
                "Failed to generate prompt. Please try again.".to_string()
            }
            other => format!(
                "Error: {}. Please check your API key and connection.",
                other
            ),
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GenerationError::Malformed(e.to_string())
        } else {
            GenerationError::Network(e.to_string())
        }
    }
}

/// A hosted model that turns a rendered prompt into text
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &RenderedPrompt) -> Result<GeneratedPrompt, GenerationError>;
}

/// Render the request and submit it to the provider
pub async fn generate_optimized_prompt(
    provider: &dyn GenerationProvider,
    request: &PromptRequest,
) -> Result<GeneratedPrompt, GenerationError> {
    let rendered = render(request);
    tracing::debug!(
        provider = provider.name(),
        mode = %request.mode,
        persona = %request.persona,
        examples = request.examples.len(),
        "Submitting prompt generation"
    );

    let result = provider.generate(&rendered).await;
    if let Err(e) = &result {
        tracing::error!("Error generating prompt: {}", e);
    }
    result
}
