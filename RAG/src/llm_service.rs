use crate::config::{LlmConfig, LlmProvider};
use crate::models::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

pub const NO_RESPONSE: &str = "No response generated";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

pub fn build_llm_client(config: &LlmConfig) -> Arc<dyn LlmClient> {
    match config.provider {
        LlmProvider::Groq => Arc::new(GroqService::new(config.clone())),
        LlmProvider::Gemini => Arc::new(GeminiService::new(config.clone())),
    }
}

/// Groq's OpenAI-compatible chat completions endpoint.
pub struct GroqService {
    client: Client,
    config: LlmConfig,
}

impl GroqService {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_output_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for GroqService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Groq API error: Status {}, Body: {}", status, error_text));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        Ok(first_choice_text(completion))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

pub struct GeminiService {
    client: Client,
    config: LlmConfig,
}

impl GeminiService {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            }),
        }
    }
}

#[async_trait]
impl LlmClient for GeminiService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Gemini API error: Status {}, Body: {}", status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        Ok(first_candidate_text(gemini_response))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn first_choice_text(completion: ChatCompletionResponse) -> String {
    completion
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_else(|| NO_RESPONSE.to_string())
}

fn first_candidate_text(response: GeminiResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .unwrap_or_else(|| NO_RESPONSE.to_string())
}
