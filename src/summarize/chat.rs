//! Chat-completions summarizer
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint.

use crate::config::SummarizerConfig;
use crate::summarize::{SummarizeError, SummarizeResult, Summarizer};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Summarizer backed by a hosted language model
pub struct ChatSummarizer {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatSummarizer {
    /// Creates a summarizer from its config section and an API key
    pub fn new(config: &SummarizerConfig, api_key: impl Into<String>) -> SummarizeResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SummarizeError::Http(e.to_string()))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn headers(&self) -> SummarizeResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| SummarizeError::InvalidApiKey)?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Builds the instruction sent for one page
fn build_prompt(title: &str, content: &str) -> String {
    format!(
        "You are an expert in e-invoicing and tax regulations. \
         Summarize the following content in 2-3 concise sentences.\n\n\
         IMPORTANT: Provide the summary ONLY in English, regardless of the source language \
         (Arabic, French, Dutch, German, etc.).\n\n\
         Title: {}\n\
         Content: {}\n\n\
         Provide a brief summary in clear, professional English. \
         Focus on the main topic and key information. Keep it under 150 words.",
        title, content
    )
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, title: &str, content: &str, url: &str) -> SummarizeResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(build_prompt(title, content)),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, url = %url, "Requesting summary");

        let response = self
            .http
            .post(&self.api_url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Status { status, body });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::InvalidResponse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(SummarizeError::EmptyResponse)
    }
}
