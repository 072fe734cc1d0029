//! Text generation via an OpenAI-compatible completions API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Produces a completion for an assembled prompt
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails or returns no choices
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stop: Vec<&'a str>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Completions client against an OpenAI-compatible endpoint
pub struct TextGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl TextGenerator {
    /// Create a new generation client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "generation API key not configured".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        })
    }
}

#[async_trait]
impl Generator for TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/completions", self.base_url);

        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            // Prompts end with "{name}:\n", so a newline closes the turn
            stop: vec!["\n"],
        };

        tracing::debug!(prompt_len = prompt.len(), model = %self.model, "requesting completion");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "completion request failed ({status}): {body}"
            )));
        }

        let completion: CompletionResponse = response.json().await?;

        let text = completion
            .choices
            .first()
            .map(|c| c.text.trim().to_string())
            .ok_or_else(|| Error::Generation("completion returned no choices".to_string()))?;

        tracing::debug!(response_len = text.len(), "completion received");

        Ok(text)
    }
}
