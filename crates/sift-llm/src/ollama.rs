//! Ollama provider for local models.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use sift_core::error::{SiftError, SiftResult};
use sift_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
use sift_core::types::{Message, MessageRole};

const OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1";

/// Ollama classifier provider. No API key; talks to a local daemon.
pub struct OllamaLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

impl OllamaLlm {
    /// Create a new Ollama provider.
    pub fn new(config: LlmConfig) -> SiftResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| OLLAMA_URL.to_string());
        Url::parse(&base_url)
            .map_err(|e| SiftError::Configuration(format!("Invalid Ollama URL: {}", e)))?;

        let client = Client::new();

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_MODEL.to_string();
        }

        Ok(Self {
            client,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Llm for OllamaLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> SiftResult<LlmResponse> {
        let options = options.unwrap_or_default();

        let chat_messages: Vec<OllamaMessage> = messages
            .iter()
            .map(|m| OllamaMessage {
                role: match m.role {
                    MessageRole::System => "system".to_string(),
                    MessageRole::User => "user".to_string(),
                    MessageRole::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect();

        let format = matches!(options.response_format, Some(ResponseFormat::Json))
            .then(|| "json".to_string());

        let request = OllamaRequest {
            model: self.config.model.clone(),
            messages: chat_messages,
            stream: false,
            format,
            options: OllamaOptions {
                temperature: options.temperature.unwrap_or(self.config.temperature),
                num_predict: options.max_tokens.unwrap_or(self.config.max_tokens),
            },
        };

        tracing::debug!(model = %request.model, "sending classification request");
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| SiftError::llm(format!("Ollama API request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SiftError::llm(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(SiftError::llm(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let response: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| SiftError::llm(format!("Failed to parse response: {}", e)))?;

        Ok(LlmResponse {
            content: response.message.map(|m| m.content),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
